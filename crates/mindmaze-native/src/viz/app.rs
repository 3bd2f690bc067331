//! eframe application for the maze game

use std::sync::PoisonError;
use std::time::Duration;

use egui::{pos2, vec2, Align2, Color32, FontId, Pos2, Rect, Stroke};
use tracing::{debug, info};

use mindmaze_core::{Cell, Direction, StimulusShape, StimulusTarget};

use crate::classifier::{ClassifierStatus, SharedStatus};
use crate::game::{FlickeringStimulus, GameSession};

const BORDER_COLOR: Color32 = Color32::from_gray(128);
const WALL_COLOR: Color32 = Color32::BLACK;
const PATH_COLOR: Color32 = Color32::WHITE;
const PLAYER_COLOR: Color32 = Color32::from_rgb(255, 0, 0);
const PANEL_COLOR: Color32 = Color32::from_rgba_premultiplied(28, 28, 28, 180);
const TITLE_COLOR: Color32 = Color32::from_rgb(255, 255, 0);
const MUTED_COLOR: Color32 = Color32::from_gray(150);

const PANEL_WIDTH: f32 = 250.0;
const BAR_WIDTH: f32 = 40.0;
const BAR_MAX_HEIGHT: f32 = 60.0;
/// Scores at or above this fill the whole bar
const BAR_FULL_SCALE: f64 = 0.5;
const HISTORY_SHOWN: usize = 8;

/// Window options
#[derive(Clone, Debug)]
pub struct ViewConfig {
    /// Window title
    pub title: String,
    /// Target frame rate
    pub fps: u32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self { title: "MindMaze".to_string(), fps: 60 }
    }
}

/// Game window state
pub struct MindMazeApp {
    session: GameSession,
    status: Option<SharedStatus>,
    metadata: Vec<(&'static str, String)>,
    instructions: Vec<String>,
    frame_interval: Duration,
}

impl MindMazeApp {
    /// Create the app around a session.
    ///
    /// `status` is the classifier feed for the score panels; `None` runs the
    /// game keyboard-only. `metadata` fills the data info panel.
    #[must_use]
    pub fn new(
        session: GameSession,
        status: Option<SharedStatus>,
        metadata: Vec<(&'static str, String)>,
        config: &ViewConfig,
    ) -> Self {
        let targets: Vec<StimulusTarget> = session.stimuli().iter().map(|s| *s.target()).collect();
        let instructions = instruction_lines(&targets, status.is_some());
        Self {
            session,
            status,
            metadata,
            instructions,
            frame_interval: Duration::from_secs_f64(1.0 / f64::from(config.fps.max(1))),
        }
    }

    fn handle_input(&mut self, ctx: &egui::Context) {
        const KEYS: [(egui::Key, Direction); 4] = [
            (egui::Key::ArrowUp, Direction::Up),
            (egui::Key::ArrowRight, Direction::Right),
            (egui::Key::ArrowDown, Direction::Down),
            (egui::Key::ArrowLeft, Direction::Left),
        ];
        for (key, direction) in KEYS {
            if ctx.input(|i| i.key_pressed(key)) {
                self.session.handle_key(direction);
            }
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            info!("Escape pressed, closing window");
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }

    fn snapshot(&self) -> Option<ClassifierStatus> {
        self.status
            .as_ref()
            .map(|s| s.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn draw_maze(&self, painter: &egui::Painter) {
        let layout = self.session.layout();
        let size = layout.cell_size as f32;
        for (y, row) in self.session.maze().rows().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                let color = match cell {
                    Cell::Wall => WALL_COLOR,
                    Cell::Path => PATH_COLOR,
                };
                painter.rect_filled(cell_rect(layout.cell_origin(x, y), size), 0.0, color);
            }
        }

        let (px, py) = self.session.player().position();
        painter.rect_filled(cell_rect(layout.cell_origin(px, py), size), 0.0, PLAYER_COLOR);
    }

    fn draw_stimuli(&self, painter: &egui::Painter) {
        for stimulus in self.session.stimuli().iter().filter(|s| s.is_visible()) {
            let color = rgb(stimulus.target().color);
            match stimulus.target().shape {
                StimulusShape::Circle => {
                    let (x, y) = stimulus.center();
                    painter.circle_filled(pos2(x, y), stimulus.size() / 2.0, color);
                }
                _ => {
                    painter.add(egui::Shape::convex_polygon(outline(stimulus), color, Stroke::NONE));
                }
            }
        }
    }

    fn draw_instructions(&self, painter: &egui::Painter) {
        let font = FontId::proportional(16.0);
        let center_x = self.session.layout().width as f32 / 2.0;
        for (i, line) in self.instructions.iter().enumerate() {
            let color = if i == 0 { Color32::WHITE } else { Color32::from_gray(200) };
            let galley = painter.layout_no_wrap(line.clone(), font.clone(), color);
            let top_left = pos2(center_x - galley.size().x / 2.0, 200.0 + i as f32 * 22.0);
            let rect = Rect::from_min_size(top_left, galley.size()).expand2(vec2(5.0, 2.0));
            painter.rect_filled(rect, 2.0, Color32::from_black_alpha(100));
            painter.galley(top_left, galley, color);
        }
    }

    fn draw_panels(&self, painter: &egui::Painter, status: Option<&ClassifierStatus>) {
        let (w, h) = (self.session.layout().width as f32, self.session.layout().height as f32);

        if !self.metadata.is_empty() || status.is_some() {
            let mut lines: Vec<(String, Color32)> =
                self.metadata.iter().map(|(k, v)| (format!("{k}: {v}"), Color32::WHITE)).collect();
            let time = status
                .and_then(|s| s.position_secs)
                .unwrap_or_else(|| self.session.elapsed_secs());
            lines.push((format!("Time: {time:.1}s"), Color32::WHITE));
            text_panel(painter, pos2(10.0, 10.0), 120.0, "DATA INFO", &lines);
        }

        let Some(status) = status else { return };

        let origin = pos2(w - PANEL_WIDTH - 10.0, 10.0);
        panel_frame(painter, origin, 120.0, "CCA SCORES");
        let base_y = origin.y + 90.0;
        let small = FontId::proportional(11.0);
        for (i, stimulus) in self.session.stimuli().iter().enumerate() {
            let target = stimulus.target();
            let score = status.latest_scores.get(i).unwrap_or(0.0);
            let x = origin.x + 15.0 + i as f32 * (BAR_WIDTH + 10.0);
            let height = score_bar_height(score);
            let bar = Rect::from_min_max(pos2(x, base_y - height), pos2(x + BAR_WIDTH, base_y));
            painter.rect_filled(bar, 0.0, rgb(target.color));
            let cx = x + BAR_WIDTH / 2.0;
            painter.text(
                pos2(cx, base_y + 3.0),
                Align2::CENTER_TOP,
                format!("{}Hz", target.frequency_hz),
                small.clone(),
                Color32::WHITE,
            );
            painter.text(
                pos2(cx, base_y + 15.0),
                Align2::CENTER_TOP,
                format!("{score:.3}"),
                small.clone(),
                Color32::WHITE,
            );
        }

        let current = match &status.current_movement {
            Some(label) => (label.clone(), Color32::WHITE),
            None => ("No movement detected".to_string(), MUTED_COLOR),
        };
        text_panel(painter, pos2(w - PANEL_WIDTH - 10.0, h - 90.0), 80.0, "CURRENT MOVE", &[current]);

        let history: Vec<(String, Color32)> = if status.history.is_empty() {
            vec![("No moves yet".to_string(), MUTED_COLOR)]
        } else {
            let skip = status.history.len().saturating_sub(HISTORY_SHOWN);
            status.history.iter().skip(skip).map(|m| (m.clone(), Color32::WHITE)).collect()
        };
        text_panel(painter, pos2(10.0, h - 160.0), 150.0, "MOVE HISTORY", &history);
    }
}

impl eframe::App for MindMazeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_input(ctx);

        let dt_ms = f64::from(ctx.input(|i| i.stable_dt)) * 1000.0;
        if let Some(queued) = self.session.tick(dt_ms) {
            debug!(direction = %queued.direction, moved = queued.moved, "Applied classifier move");
        }

        let status = self.snapshot();
        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(BORDER_COLOR))
            .show(ctx, |ui| {
                let painter = ui.painter();
                self.draw_maze(painter);
                self.draw_stimuli(painter);
                if self.session.moves() == 0 {
                    self.draw_instructions(painter);
                }
                self.draw_panels(painter, status.as_ref());
            });

        ctx.request_repaint_after(self.frame_interval);
    }
}

/// Open the game window and block until it is closed.
///
/// # Errors
///
/// Returns the eframe error if the window or graphics context cannot be
/// created.
pub fn run_app(
    session: GameSession,
    status: Option<SharedStatus>,
    metadata: Vec<(&'static str, String)>,
    config: ViewConfig,
) -> eframe::Result<()> {
    let layout = *session.layout();
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(config.title.clone())
            .with_inner_size([layout.width as f32, layout.height as f32])
            .with_resizable(false),
        ..Default::default()
    };

    info!(width = layout.width, height = layout.height, fps = config.fps, "Opening game window");
    let app = MindMazeApp::new(session, status, metadata, &config);
    eframe::run_native(&config.title, native_options, Box::new(|_cc| Ok(Box::new(app))))
}

fn rgb([r, g, b]: [u8; 3]) -> Color32 {
    Color32::from_rgb(r, g, b)
}

fn cell_rect((x, y): (f32, f32), size: f32) -> Rect {
    Rect::from_min_size(pos2(x, y), vec2(size, size))
}

fn outline(stimulus: &FlickeringStimulus) -> Vec<Pos2> {
    stimulus.outline().into_iter().map(|(x, y)| pos2(x, y)).collect()
}

fn panel_frame(painter: &egui::Painter, origin: Pos2, height: f32, title: &str) {
    painter.rect_filled(Rect::from_min_size(origin, vec2(PANEL_WIDTH, height)), 4.0, PANEL_COLOR);
    painter.text(
        origin + vec2(5.0, 5.0),
        Align2::LEFT_TOP,
        title,
        FontId::proportional(14.0),
        TITLE_COLOR,
    );
}

fn text_panel(painter: &egui::Painter, origin: Pos2, height: f32, title: &str, lines: &[(String, Color32)]) {
    panel_frame(painter, origin, height, title);
    let font = FontId::proportional(12.0);
    for (i, (line, color)) in lines.iter().enumerate() {
        let pos = origin + vec2(5.0, 25.0 + i as f32 * 15.0);
        painter.text(pos, Align2::LEFT_TOP, line, font.clone(), *color);
    }
}

/// Bar height in pixels, saturating at [`BAR_FULL_SCALE`]
fn score_bar_height(score: f64) -> f32 {
    ((score / BAR_FULL_SCALE).clamp(0.0, 1.0) as f32) * BAR_MAX_HEIGHT
}

fn instruction_lines(targets: &[StimulusTarget], classifier: bool) -> Vec<String> {
    let mode = if classifier { "BCI Maze" } else { "BCI Maze (keyboard only)" };
    let mut lines = vec![mode.to_string(), "Look at flickering shapes to move:".to_string()];
    lines.extend(targets.iter().map(|t| {
        format!("{} ({}Hz) = {}", t.shape.name(), t.frequency_hz, t.direction)
    }));
    lines.push("Keyboard: arrow keys work too".to_string());
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_bar_height() {
        assert_eq!(score_bar_height(0.0), 0.0);
        assert!((score_bar_height(0.25) - 30.0).abs() < 1e-4);
        assert_eq!(score_bar_height(0.9), BAR_MAX_HEIGHT);
    }

    #[test]
    fn test_instruction_lines() {
        let lines = instruction_lines(&StimulusTarget::default_set(), true);
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[2], "Circle (5Hz) = UP");
        assert_eq!(lines[5], "Diamond (20Hz) = LEFT");
        assert!(instruction_lines(&[], false)[0].contains("keyboard"));
    }
}
