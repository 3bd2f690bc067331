//! BrainFlow-compatible board layout
//!
//! BrainFlow returns board data as rows × samples, one row per data type.
//! The synthetic board writes its samples in the same row order an OpenBCI
//! board would, so everything downstream reads a single layout:
//!
//! ```text
//! row 0          package number
//! rows 1..=N     EEG (µV)
//! next 3 rows    accelerometer X, Y, Z (g)
//! next row       timestamp (s)
//! last row       marker
//! ```

use std::collections::VecDeque;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use mindmaze_core::EegChannel;

/// Boards the host knows the layout of, with BrainFlow's numeric ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(i32)]
pub enum BoardId {
    /// File playback through BrainFlow
    PlaybackFile = -3,
    /// BrainFlow's synthetic board
    Synthetic = -1,
    /// OpenBCI Cyton, 8 channels
    Cyton = 0,
    /// OpenBCI Ganglion, 4 channels
    Ganglion = 1,
    /// OpenBCI Cyton with Daisy module, 16 channels
    CytonDaisy = 2,
}

impl BoardId {
    /// Every supported board
    pub const ALL: [Self; 5] = [
        Self::Synthetic,
        Self::PlaybackFile,
        Self::Cyton,
        Self::CytonDaisy,
        Self::Ganglion,
    ];

    /// Display name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::PlaybackFile => "Playback File",
            Self::Synthetic => "Synthetic Board",
            Self::Cyton => "OpenBCI Cyton",
            Self::Ganglion => "OpenBCI Ganglion",
            Self::CytonDaisy => "OpenBCI Cyton+Daisy",
        }
    }

    /// EEG channel count
    #[must_use]
    pub fn eeg_channels(self) -> usize {
        match self {
            Self::Ganglion => 4,
            Self::CytonDaisy => 16,
            Self::PlaybackFile | Self::Synthetic | Self::Cyton => 8,
        }
    }

    /// Sampling rate in Hz
    #[must_use]
    pub fn sampling_rate(self) -> f64 {
        match self {
            Self::Ganglion => 200.0,
            Self::CytonDaisy => 125.0,
            Self::PlaybackFile | Self::Synthetic | Self::Cyton => 250.0,
        }
    }

    /// BrainFlow's numeric board id
    #[must_use]
    pub fn id(self) -> i32 {
        self as i32
    }
}

impl std::fmt::Display for BoardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.id())
    }
}

/// Row layout of one sample for a given board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrainFlowFormat {
    board: BoardId,
    eeg_names: Vec<String>,
}

impl BrainFlowFormat {
    /// Layout for `board`
    #[must_use]
    pub fn for_board(board: BoardId) -> Self {
        Self { board, eeg_names: eeg_labels(board.eeg_channels()) }
    }

    /// Layout of an OpenBCI Cyton (14 rows)
    #[must_use]
    pub fn cyton() -> Self {
        Self::for_board(BoardId::Cyton)
    }

    /// Board this layout belongs to
    #[must_use]
    pub fn board(&self) -> BoardId {
        self.board
    }

    /// Electrode labels of the EEG rows, in row order
    #[must_use]
    pub fn eeg_names(&self) -> &[String] {
        &self.eeg_names
    }

    /// Rows holding EEG
    #[must_use]
    pub fn eeg_rows(&self) -> Range<usize> {
        1..1 + self.eeg_names.len()
    }

    /// Rows holding the accelerometer axes
    #[must_use]
    pub fn accel_rows(&self) -> Range<usize> {
        let start = self.eeg_rows().end;
        start..start + 3
    }

    /// Timestamp row
    #[must_use]
    pub fn timestamp_row(&self) -> usize {
        self.accel_rows().end
    }

    /// Marker row, always last
    #[must_use]
    pub fn marker_row(&self) -> usize {
        self.timestamp_row() + 1
    }

    /// Rows per sample
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.marker_row() + 1
    }

    /// Pack one sample. Extra EEG values are ignored and missing ones stay 0.
    #[must_use]
    pub fn packet(&self, eeg: &[f64], timestamp: f64, marker: i32) -> BrainFlowPacket {
        let mut data = vec![0.0; self.num_rows()];
        for (cell, &v) in data[self.eeg_rows()].iter_mut().zip(eeg) {
            *cell = v;
        }
        data[self.timestamp_row()] = timestamp;
        data[self.marker_row()] = f64::from(marker);
        BrainFlowPacket { data }
    }

    /// EEG values of a packet in this layout
    #[must_use]
    pub fn eeg<'a>(&self, packet: &'a BrainFlowPacket) -> &'a [f64] {
        packet.data.get(self.eeg_rows()).unwrap_or(&[])
    }

    /// Timestamp of a packet in this layout
    #[must_use]
    pub fn timestamp(&self, packet: &BrainFlowPacket) -> f64 {
        packet.data.get(self.timestamp_row()).copied().unwrap_or(0.0)
    }

    /// Marker of a packet in this layout; 0 means no stimulus
    #[must_use]
    pub fn marker(&self, packet: &BrainFlowPacket) -> i32 {
        packet.data.get(self.marker_row()).map_or(0, |&v| v as i32)
    }
}

/// Electrode labels for an `n`-channel montage.
///
/// Eight-channel boards use the usual OpenBCI cap placement with the two
/// occipital electrodes last; other sizes take the 10-20 list in order.
fn eeg_labels(n: usize) -> Vec<String> {
    use EegChannel::{C3, C4, Fp1, Fp2, O1, O2, P3, P4};

    if n == 8 {
        return [Fp1, Fp2, C3, C4, P3, P4, O1, O2].iter().map(|c| c.name().to_string()).collect();
    }
    (0..n)
        .map(|i| EegChannel::ALL.get(i).map_or_else(|| format!("EEG_{}", i + 1), |c| c.name().to_string()))
        .collect()
}

/// One sample, all rows.
#[derive(Debug, Clone, PartialEq)]
pub struct BrainFlowPacket {
    /// Row values; row 0 is the package number
    pub data: Vec<f64>,
}

/// Fixed-capacity sample history that evicts the oldest sample when full.
///
/// Reads copy out the newest samples and leave the buffer intact, like
/// BrainFlow's `get_current_board_data`.
#[derive(Debug)]
pub struct BrainFlowBuffer {
    format: BrainFlowFormat,
    packets: VecDeque<BrainFlowPacket>,
    capacity: usize,
    sequence: u32,
}

impl BrainFlowBuffer {
    /// Empty buffer holding at most `capacity` samples (minimum 1)
    #[must_use]
    pub fn new(format: BrainFlowFormat, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { format, packets: VecDeque::with_capacity(capacity), capacity, sequence: 0 }
    }

    /// Append a sample, stamping its package number
    pub fn push(&mut self, mut packet: BrainFlowPacket) {
        if let Some(cell) = packet.data.first_mut() {
            *cell = f64::from(self.sequence);
        }
        self.sequence = self.sequence.wrapping_add(1);

        if self.packets.len() == self.capacity {
            self.packets.pop_front();
        }
        self.packets.push_back(packet);
    }

    /// Newest `min(num_samples, len)` samples as rows × samples, oldest first
    #[must_use]
    pub fn current_board_data(&self, num_samples: usize) -> Vec<Vec<f64>> {
        let skip = self.packets.len().saturating_sub(num_samples);
        let mut rows = vec![Vec::with_capacity(self.packets.len() - skip); self.format.num_rows()];
        for packet in self.packets.iter().skip(skip) {
            for (row, &v) in rows.iter_mut().zip(&packet.data) {
                row.push(v);
            }
        }
        rows
    }

    /// Newest samples of the EEG rows only, channels × samples
    #[must_use]
    pub fn current_eeg(&self, num_samples: usize) -> Vec<Vec<f64>> {
        let mut rows = self.current_board_data(num_samples);
        rows.drain(self.format.eeg_rows()).collect()
    }

    /// Layout of the stored samples
    #[must_use]
    pub fn format(&self) -> &BrainFlowFormat {
        &self.format
    }

    /// Samples held
    #[must_use]
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// True when nothing has been pushed since the last clear
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Packets pushed since creation, wrapping at `u32::MAX`
    #[must_use]
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Drop all samples; the package counter keeps running
    pub fn clear(&mut self) {
        self.packets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eeg_packet(format: &BrainFlowFormat, value: f64) -> BrainFlowPacket {
        format.packet(&vec![value; format.eeg_names().len()], 0.0, 0)
    }

    #[test]
    fn test_cyton_rows() {
        let format = BrainFlowFormat::cyton();
        assert_eq!(format.board(), BoardId::Cyton);
        assert_eq!(format.eeg_rows(), 1..9);
        assert_eq!(format.accel_rows(), 9..12);
        assert_eq!(format.timestamp_row(), 12);
        assert_eq!(format.marker_row(), 13);
        assert_eq!(format.num_rows(), 14);
        assert_eq!(format.eeg_names()[6..], ["O1".to_string(), "O2".to_string()]);
    }

    #[test]
    fn test_board_layouts() {
        for board in BoardId::ALL {
            let format = BrainFlowFormat::for_board(board);
            assert_eq!(format.eeg_rows().len(), board.eeg_channels());
            assert_eq!(format.num_rows(), board.eeg_channels() + 6);
        }
        assert_eq!(BoardId::Synthetic.id(), -1);
        assert_eq!(BoardId::Ganglion.to_string(), "OpenBCI Ganglion (1)");
        assert_eq!(BrainFlowFormat::for_board(BoardId::CytonDaisy).eeg_names()[15], "T6");
    }

    #[test]
    fn test_packet_roundtrip() {
        let format = BrainFlowFormat::cyton();
        let packet = format.packet(&[2.5; 8], 123.456, 3);
        assert_eq!(packet.data.len(), 14);
        assert_eq!(format.eeg(&packet), &[2.5; 8]);
        assert_eq!(format.timestamp(&packet), 123.456);
        assert_eq!(format.marker(&packet), 3);

        // Short input leaves the remaining EEG rows at zero
        let short = format.packet(&[1.0, 2.0], 0.0, 0);
        assert_eq!(format.eeg(&short)[..3], [1.0, 2.0, 0.0]);
    }

    #[test]
    fn test_buffer_returns_newest_samples() {
        let format = BrainFlowFormat::cyton();
        let mut buffer = BrainFlowBuffer::new(format.clone(), 100);
        for i in 0..10 {
            buffer.push(eeg_packet(&format, f64::from(i)));
        }
        assert_eq!(buffer.len(), 10);

        let data = buffer.current_board_data(5);
        assert_eq!(data.len(), 14);
        assert_eq!(data[1], vec![5.0, 6.0, 7.0, 8.0, 9.0]);
        // Package numbers are stamped on push
        assert_eq!(data[0], vec![5.0, 6.0, 7.0, 8.0, 9.0]);

        assert_eq!(buffer.current_board_data(50)[0].len(), 10);
        assert_eq!(buffer.len(), 10);
    }

    #[test]
    fn test_buffer_evicts_oldest() {
        let format = BrainFlowFormat::cyton();
        let mut buffer = BrainFlowBuffer::new(format.clone(), 4);
        for i in 0..7 {
            buffer.push(eeg_packet(&format, f64::from(i)));
        }
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.sequence(), 7);

        let eeg = buffer.current_eeg(3);
        assert_eq!(eeg.len(), 8);
        assert_eq!(eeg[0], vec![4.0, 5.0, 6.0]);

        buffer.clear();
        assert!(buffer.is_empty());
        assert!(buffer.current_eeg(3).iter().all(Vec::is_empty));
    }
}
