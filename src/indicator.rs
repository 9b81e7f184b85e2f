use eframe::egui::{self, Color32, Pos2, Sense, Stroke, Vec2};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};

use crate::{
    config::{
        INDICATOR_COLOR_ACTIVE, INDICATOR_COLOR_INACTIVE, INDICATOR_MARGIN, INDICATOR_OPACITY,
        INDICATOR_SIZE,
    },
    controller::Controller,
    mouse,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Corner {
    #[default]
    TopRight,
    TopLeft,
    BottomRight,
    BottomLeft,
}

impl Corner {
    pub const ALL: [Corner; 4] = [Corner::TopRight, Corner::TopLeft, Corner::BottomRight, Corner::BottomLeft];

    pub fn label(self) -> &'static str {
        match self {
            Corner::TopRight => "Top right",
            Corner::TopLeft => "Top left",
            Corner::BottomRight => "Bottom right",
            Corner::BottomLeft => "Bottom left",
        }
    }

    /// Top-left of a `size` square inset by `margin` from this corner of `screen`.
    pub fn position(self, screen: Vec2, size: f32, margin: f32) -> Pos2 {
        let far_x = (screen.x - size - margin).max(0.0);
        let far_y = (screen.y - size - margin).max(0.0);
        match self {
            Corner::TopRight => Pos2::new(far_x, margin),
            Corner::TopLeft => Pos2::new(margin, margin),
            Corner::BottomRight => Pos2::new(far_x, far_y),
            Corner::BottomLeft => Pos2::new(margin, far_y),
        }
    }
}

/// Share of the current wait still left, for the countdown arc.
pub fn countdown_fraction(remaining: Duration, total: Duration) -> Option<f32> {
    if total.is_zero() || remaining.is_zero() {
        return None;
    }
    Some((remaining.as_secs_f32() / total.as_secs_f32()).clamp(0.0, 1.0))
}

/// Origin and size of the primary display.
fn primary_screen() -> (Pos2, Vec2) {
    match display_info::DisplayInfo::all() {
        Ok(displays) => {
            if let Some(d) = displays.iter().find(|d| d.is_primary).or_else(|| displays.first()) {
                return (
                    Pos2::new(d.x as f32, d.y as f32),
                    Vec2::new(d.width as f32, d.height as f32),
                );
            }
        }
        Err(err) => tracing::debug!(error = %err, "display-info unavailable, using enigo"),
    }
    let (w, h) = mouse::main_display_size();
    (Pos2::ZERO, Vec2::new(w as f32, h as f32))
}

fn with_opacity(color: Color32, opacity: f32) -> Color32 {
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), alpha)
}

/// What the dot shows, read straight from the controller on each overlay frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DotState {
    pub active: bool,
    pub countdown: Option<f32>,
}

impl DotState {
    pub fn read(controller: &Controller) -> Self {
        let status = controller.status();
        let countdown = status
            .next_click
            .filter(|_| status.is_active)
            .and_then(|p| countdown_fraction(p.remaining(), p.interval));
        Self { active: status.is_active, countdown }
    }
}

pub fn viewport_id() -> egui::ViewportId {
    egui::ViewportId::from_hash_of("status_indicator")
}

/// Brings the settings window back from the taskbar.
pub fn restore_root(ctx: &egui::Context) {
    ctx.send_viewport_cmd_to(egui::ViewportId::ROOT, egui::ViewportCommand::Minimized(false));
    ctx.send_viewport_cmd_to(egui::ViewportId::ROOT, egui::ViewportCommand::Focus);
}

/// Frameless always-on-top dot showing whether clicking is active.
///
/// Lives in a deferred viewport with its own repaint loop, so it keeps
/// updating while the settings window is minimized.
pub struct StatusIndicator {
    /// Primary display origin and size, looked up on first draw.
    screen: Option<(Pos2, Vec2)>,
    corner: Corner,
    visible: bool,
}

impl StatusIndicator {
    pub fn new(corner: Corner, visible: bool) -> Self {
        Self { screen: None, corner, visible }
    }

    pub fn set_visible(&mut self, visible: bool) { self.visible = visible; }
    pub fn set_corner(&mut self, corner: Corner) { self.corner = corner; }

    pub fn outer_position(&mut self) -> Pos2 {
        let (origin, size) = *self.screen.get_or_insert_with(|| {
            let screen = primary_screen();
            tracing::debug!(origin = ?screen.0, size = ?screen.1, "status indicator screen");
            screen
        });
        origin + self.corner.position(size, INDICATOR_SIZE, INDICATOR_MARGIN).to_vec2()
    }

    /// Keeps the overlay viewport alive. Must be called on every root frame;
    /// skipping a frame closes it.
    pub fn show(&mut self, ctx: &egui::Context, controller: &Arc<Mutex<Controller>>) {
        if !self.visible {
            return;
        }

        let builder = egui::ViewportBuilder::default()
            .with_title("clickclick status")
            .with_inner_size([INDICATOR_SIZE, INDICATOR_SIZE])
            .with_position(self.outer_position())
            .with_decorations(false)
            .with_resizable(false)
            .with_transparent(true)
            .with_taskbar(false)
            .with_window_level(egui::WindowLevel::AlwaysOnTop);

        let controller = Arc::clone(controller);
        ctx.show_viewport_deferred(viewport_id(), builder, move |ctx, _class| {
            let dot = DotState::read(&controller.lock());
            egui::CentralPanel::default().frame(egui::Frame::none()).show(ctx, |ui| {
                let rect = ui.max_rect();
                let resp = ui.interact(rect, ui.id().with("dot"), Sense::click());
                if resp.clicked() {
                    restore_root(ctx);
                }
                paint_dot(ui.painter(), rect, dot);
            });
            if dot.active {
                ctx.request_repaint_after(Duration::from_millis(120));
            }
        });
    }
}

fn paint_dot(painter: &egui::Painter, rect: egui::Rect, dot: DotState) {
    let center = rect.center();
    let radius = rect.width().min(rect.height()) / 2.0 - 2.0;
    let fill = if dot.active { INDICATOR_COLOR_ACTIVE } else { INDICATOR_COLOR_INACTIVE };
    painter.circle_filled(center, radius, with_opacity(fill, INDICATOR_OPACITY));

    if let Some(fraction) = dot.countdown {
        let points = arc_points(center, radius - 3.0, fraction);
        painter.add(egui::Shape::line(points, Stroke::new(3.0, Color32::WHITE)));
    }
}

/// Clockwise arc from twelve o'clock covering `fraction` of a full turn.
fn arc_points(center: Pos2, radius: f32, fraction: f32) -> Vec<Pos2> {
    const SEGMENTS: usize = 48;
    let steps = ((SEGMENTS as f32 * fraction).ceil() as usize).max(1);
    let sweep = std::f32::consts::TAU * fraction;
    (0..=steps)
        .map(|i| {
            let angle = -std::f32::consts::FRAC_PI_2 + sweep * (i as f32 / steps as f32);
            center + Vec2::angled(angle) * radius
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corner_positions() {
        let screen = Vec2::new(1920.0, 1080.0);
        assert_eq!(Corner::TopRight.position(screen, 30.0, 20.0), Pos2::new(1870.0, 20.0));
        assert_eq!(Corner::TopLeft.position(screen, 30.0, 20.0), Pos2::new(20.0, 20.0));
        assert_eq!(Corner::BottomRight.position(screen, 30.0, 20.0), Pos2::new(1870.0, 1030.0));
        assert_eq!(Corner::BottomLeft.position(screen, 30.0, 20.0), Pos2::new(20.0, 1030.0));
    }

    #[test]
    fn test_corner_position_clamps_on_tiny_screens() {
        let p = Corner::BottomRight.position(Vec2::new(10.0, 10.0), 30.0, 20.0);
        assert_eq!(p, Pos2::ZERO);
    }

    #[test]
    fn test_corner_serde_names() {
        assert_eq!(serde_json::to_string(&Corner::BottomLeft).unwrap(), r#""bottom-left""#);
        assert_eq!(Corner::default(), Corner::TopRight);
    }

    #[test]
    fn test_countdown_fraction() {
        let total = Duration::from_secs(2);
        assert_eq!(countdown_fraction(Duration::from_secs(1), total), Some(0.5));
        assert_eq!(countdown_fraction(Duration::ZERO, total), None);
        assert_eq!(countdown_fraction(Duration::from_secs(1), Duration::ZERO), None);
        assert_eq!(countdown_fraction(Duration::from_secs(5), total), Some(1.0));
    }

    #[test]
    fn test_arc_starts_at_twelve_oclock() {
        let points = arc_points(Pos2::new(10.0, 10.0), 5.0, 0.25);
        let first = points[0];
        let last = *points.last().unwrap();
        assert!((first.x - 10.0).abs() < 1e-4 && (first.y - 5.0).abs() < 1e-4);
        // a quarter turn clockwise on screen lands at three o'clock
        assert!((last.x - 15.0).abs() < 1e-3 && (last.y - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_opacity() {
        assert_eq!(with_opacity(Color32::RED, 0.7).a(), 179);
        assert_eq!(with_opacity(Color32::RED, 2.0).a(), 255);
    }
}
