use egui::{
    pos2, vec2, Align2, Color32, Context, FontId, Id, LayerId, Mesh, Order, Painter, Pos2, Rect,
    RichText, ScrollArea, Sense, Shape, Slider, Stroke, Ui, Vec2,
};

use super::event::UiEvent;
use super::state::*;
use crate::chart::aligner::{shift_label, FEAR_LINE_WIDTH, VOL_OPACITY};
use crate::chart::candle::CandleTooltip;
use crate::chart::stream::Y_AXIS_TITLE;
use crate::chart::{AlignerLayout, BrushGesture, CandleLayout, StreamLayout, StreamTooltip};
use crate::comments::{CommentPanelView, PanelBody, EMPTY_PLACEHOLDER};
use crate::palette::{self, legend_color, LEGEND_STOPS};
use crate::scale::{LinearScale, TimeScale};

struct Insets {
    left: f32,
    right: f32,
    top: f32,
    bottom: f32,
}

const CANDLE_INSETS: Insets = Insets { left: 60.0, right: 50.0, top: 40.0, bottom: 30.0 };
const STREAM_INSETS: Insets = Insets { left: 60.0, right: 30.0, top: 30.0, bottom: 30.0 };
const ALIGNER_INSETS: Insets = Insets { left: 60.0, right: 60.0, top: 30.0, bottom: 30.0 };

const FOCUS_HEIGHT: f32 = 320.0;
const CONTEXT_GAP: f32 = 10.0;
const CONTEXT_HEIGHT: f32 = 30.0;
const CONTEXT_AXIS: f32 = 20.0;
const STREAM_HEIGHT: f32 = 260.0;
const ALIGNER_HEIGHT: f32 = 260.0;
const MIN_PLOT_WIDTH: f32 = 120.0;

const LEGEND_WIDTH: f32 = 150.0;
const LEGEND_HEIGHT: f32 = 10.0;
const TICK_LEN: f32 = 6.0;

const CANDLE_TIP_OFFSET: Vec2 = Vec2::new(15.0, -28.0);
const STREAM_TIP_OFFSET: Vec2 = Vec2::new(20.0, -60.0);
const TIP_FADE_IN: f32 = 0.2;
const TIP_FADE_OUT: f32 = 0.5;

const INK: Color32 = Color32::from_rgb(0x1a, 0x1a, 0x1a);
const TIP_BG: Color32 = Color32::from_rgba_premultiplied(30, 33, 37, 235);
const BRUSH_FILL: Color32 = Color32::from_rgba_premultiplied(36, 36, 36, 77);

/// Pointer gesture state that only lives between frames.
#[derive(Debug, Default)]
pub struct Interaction {
    brush: Option<BrushGesture>,
}

/// Plot sizes for a central area `width` points wide.
pub fn layouts_for(width: f32) -> Layouts {
    let plot = |insets: &Insets| (width - insets.left - insets.right).max(MIN_PLOT_WIDTH);
    Layouts {
        candle: CandleLayout {
            width: plot(&CANDLE_INSETS),
            focus_height: FOCUS_HEIGHT,
            context_height: CONTEXT_HEIGHT,
        },
        stream: StreamLayout {
            width: plot(&STREAM_INSETS),
            height: STREAM_HEIGHT,
        },
        aligner: AlignerLayout {
            width: plot(&ALIGNER_INSETS),
            height: ALIGNER_HEIGHT,
        },
    }
}

/// Paint one frame from `state`; interactions come back as events.
pub fn render(ctx: &Context, state: &DashState, interaction: &mut Interaction) -> Vec<UiEvent> {
    let mut events = Vec::new();

    egui::SidePanel::right("comments")
        .resizable(true)
        .default_width(340.0)
        .show(ctx, |ui| comment_panel(ui, &state.panel));

    egui::CentralPanel::default().show(ctx, |ui| {
        if state.loading {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("Loading data…").color(palette::AXIS_MUTED));
            });
            return;
        }

        ScrollArea::vertical().show(ui, |ui| {
            let wanted = layouts_for(ui.available_width());
            if wanted != state.layouts() {
                events.push(UiEvent::Resized {
                    candle: wanted.candle,
                    stream: wanted.stream,
                    aligner: wanted.aligner,
                });
            }

            section_title(ui, "Price & Fear");
            candle_section(ui, state, interaction, &mut events);
            ui.add_space(16.0);
            section_title(ui, "Sentiment Volume");
            stream_section(ui, state, &mut events);
            ui.add_space(16.0);
            section_title(ui, "Fear vs. Volatility");
            aligner_section(ui, state, &mut events);
        });
    });

    candle_tooltip_layer(ctx, state);
    if let Some(hover) = &state.stream_hover {
        let lines = stream_tip_lines(&hover.tip.content);
        draw_tooltip(ctx, "stream_tip", hover.tip.pointer + STREAM_TIP_OFFSET, &lines, 1.0);
    }

    events
}

fn section_title(ui: &mut Ui, text: &str) {
    ui.label(RichText::new(text).strong().size(15.0).color(INK));
}

fn comment_panel(ui: &mut Ui, view: &CommentPanelView) {
    ui.add_space(6.0);
    ui.heading("Trending Comments");
    ui.label(RichText::new(&view.header).strong());
    ui.separator();

    ScrollArea::vertical().show(ui, |ui| match &view.body {
        PanelBody::Idle => {}
        PanelBody::Empty => {
            ui.add_space(8.0);
            ui.label(RichText::new(EMPTY_PLACEHOLDER).small().color(palette::AXIS_MUTED));
        }
        PanelBody::Items(items) => {
            for item in items {
                ui.horizontal(|ui| {
                    egui::Frame::none()
                        .fill(item.badge)
                        .rounding(3.0)
                        .inner_margin(vec2(6.0, 2.0))
                        .show(ui, |ui| {
                            ui.label(RichText::new(&item.label).small().color(Color32::WHITE));
                        });
                    ui.label(
                        RichText::new(&item.score_label)
                            .small()
                            .strong()
                            .color(palette::AXIS_MUTED),
                    );
                });
                ui.label(RichText::new(&item.body).color(INK));
                ui.add_space(4.0);
                ui.separator();
            }
        }
    });
}

fn candle_section(
    ui: &mut Ui,
    state: &DashState,
    interaction: &mut Interaction,
    events: &mut Vec<UiEvent>,
) {
    let chart = &state.candle;
    let records = &state.dataset.records;
    let layout = chart.layout();

    let total = vec2(
        CANDLE_INSETS.left + layout.width + CANDLE_INSETS.right,
        CANDLE_INSETS.top
            + layout.focus_height
            + CANDLE_INSETS.bottom
            + CONTEXT_GAP
            + layout.context_height
            + CONTEXT_AXIS,
    );
    let (resp, painter) = ui.allocate_painter(total, Sense::hover());
    let origin = resp.rect.min;
    let focus = Rect::from_min_size(
        origin + vec2(CANDLE_INSETS.left, CANDLE_INSETS.top),
        vec2(layout.width, layout.focus_height),
    );
    let strip = Rect::from_min_size(
        pos2(focus.left(), focus.bottom() + CANDLE_INSETS.bottom + CONTEXT_GAP),
        vec2(layout.width, layout.context_height),
    );

    legend(&painter, pos2(focus.right() - LEGEND_WIDTH, origin.y + 10.0));
    painter.text(
        pos2(origin.x + 4.0, origin.y + 10.0),
        Align2::LEFT_TOP,
        "GME Stock Price (USD)",
        FontId::proportional(12.0),
        INK,
    );

    // focus plot
    let focus_painter = painter.with_clip_rect(focus);
    let offset = focus.min.to_vec2();
    for g in chart.glyphs(records) {
        let body = g.body.translate(offset);
        if body.right() < focus.left() || body.left() > focus.right() {
            continue;
        }
        let x = g.x + offset.x;
        focus_painter.line_segment(
            [pos2(x, g.wick_top + offset.y), pos2(x, g.wick_bottom + offset.y)],
            Stroke::new(1.0, palette::WICK),
        );
        focus_painter.rect_filled(body, 0.0, g.fill);
        if state.hovered_candle == Some(g.index) {
            focus_painter.rect_stroke(body, 0.0, Stroke::new(2.0, Color32::BLACK));
        }
    }
    time_axis(&painter, chart.focus_scale(), focus, "%m/%d");
    value_axis(&painter, chart.y_scale(), focus, focus.left(), true, palette::AXIS_MUTED);

    // hover
    match resp.hover_pos().filter(|p| focus.contains(*p)) {
        Some(p) => match chart.hit_test(records, p - offset) {
            Some(index) => events.push(UiEvent::CandleHovered { index, pointer: p }),
            None if state.hovered_candle.is_some() => events.push(UiEvent::CandleLeft),
            None => {}
        },
        None if state.hovered_candle.is_some() => events.push(UiEvent::CandleLeft),
        None => {}
    }

    // overview strip
    let strip_offset = strip.min.to_vec2();
    let line: Vec<Pos2> = chart
        .context_line(records)
        .into_iter()
        .map(|p| p + strip_offset)
        .collect();
    painter.add(Shape::line(line, Stroke::new(1.0, palette::CONTEXT_LINE)));
    time_axis(&painter, chart.context_scale(), strip, "%m/%d");

    if let Some((a, b)) = chart.selection_px() {
        let sel = Rect::from_min_max(pos2(strip.left() + a, strip.top()), pos2(strip.left() + b, strip.bottom()));
        painter.rect_filled(sel, 0.0, BRUSH_FILL);
        painter.rect_stroke(sel, 0.0, Stroke::new(1.0, Color32::WHITE));
    }

    brush_input(ui, state, interaction, strip, events);
}

fn brush_input(
    ui: &mut Ui,
    state: &DashState,
    interaction: &mut Interaction,
    strip: Rect,
    events: &mut Vec<UiEvent>,
) {
    let resp = ui.interact(strip, ui.id().with("brush"), Sense::click_and_drag());
    let width = strip.width();
    let current = state.candle.selection_px();

    if resp.drag_started() {
        let press = ui
            .input(|i| i.pointer.press_origin())
            .or_else(|| resp.interact_pointer_pos());
        interaction.brush = press.map(|p| BrushGesture::begin(p.x - strip.left(), current));
    }

    if resp.dragged() {
        if let (Some(gesture), Some(p)) = (interaction.brush, resp.interact_pointer_pos()) {
            let next = gesture.update(p.x - strip.left(), width);
            if next != current {
                events.push(UiEvent::BrushChanged { selection_px: next });
            }
        }
    } else {
        interaction.brush = None;
    }

    if resp.clicked() {
        let inside = resp
            .interact_pointer_pos()
            .map(|p| p.x - strip.left())
            .zip(current)
            .is_some_and(|(x, (a, b))| x >= a && x <= b);
        if !inside && current.is_some() {
            events.push(UiEvent::BrushChanged { selection_px: None });
        }
    }
}

fn stream_section(ui: &mut Ui, state: &DashState, events: &mut Vec<UiEvent>) {
    let chart = &state.stream;
    let records = &state.dataset.records;
    let layout = chart.layout();

    let total = vec2(
        STREAM_INSETS.left + layout.width + STREAM_INSETS.right,
        STREAM_INSETS.top + layout.height + STREAM_INSETS.bottom,
    );
    let (resp, painter) = ui.allocate_painter(total, Sense::hover());
    let origin = resp.rect.min;
    let plot = Rect::from_min_size(
        origin + vec2(STREAM_INSETS.left, STREAM_INSETS.top),
        vec2(layout.width, layout.height),
    );
    let offset = plot.min.to_vec2();

    for path in chart.paths(records) {
        painter.add(fill_between(&path.top, &path.bottom, offset, path.fill));
    }
    time_axis(&painter, chart.x_scale(), plot, "%b %d");
    value_axis(&painter, chart.y_scale(), plot, plot.left(), true, palette::AXIS_MUTED);
    painter.text(
        pos2(origin.x + 4.0, origin.y + 6.0),
        Align2::LEFT_TOP,
        Y_AXIS_TITLE,
        FontId::proportional(12.0),
        INK,
    );

    if let Some(hover) = &state.stream_hover {
        let x = plot.left() + hover.guide_x;
        painter.extend(Shape::dashed_line(
            &[pos2(x, plot.top()), pos2(x, plot.bottom())],
            Stroke::new(1.5, INK),
            4.0,
            4.0,
        ));
    }

    match resp.hover_pos().filter(|p| plot.contains(*p)) {
        Some(p) => events.push(UiEvent::StreamHovered {
            x_px: p.x - plot.left(),
            pointer: p,
        }),
        None if state.stream_hover.is_some() => events.push(UiEvent::StreamLeft),
        None => {}
    }
}

fn aligner_section(ui: &mut Ui, state: &DashState, events: &mut Vec<UiEvent>) {
    let chart = &state.aligner;
    let records = &state.dataset.records;
    let layout = chart.layout();

    let total = vec2(
        ALIGNER_INSETS.left + layout.width + ALIGNER_INSETS.right,
        ALIGNER_INSETS.top + layout.height + ALIGNER_INSETS.bottom,
    );
    let (resp, painter) = ui.allocate_painter(total, Sense::hover());
    let origin = resp.rect.min;
    let plot = Rect::from_min_size(
        origin + vec2(ALIGNER_INSETS.left, ALIGNER_INSETS.top),
        vec2(layout.width, layout.height),
    );
    let offset = plot.min.to_vec2();

    let edge = chart.volatility_edge(records);
    let floor: Vec<Pos2> = edge.iter().map(|p| pos2(p.x, layout.height)).collect();
    painter.add(fill_between(
        &edge,
        &floor,
        offset,
        palette::VOL_FILL.gamma_multiply(VOL_OPACITY),
    ));

    let shift = vec2(chart.shift_px(state.shift_days), 0.0);
    let line: Vec<Pos2> = chart
        .fear_line(records)
        .into_iter()
        .map(|p| p + offset + shift)
        .collect();
    painter
        .with_clip_rect(plot)
        .add(Shape::line(line, Stroke::new(FEAR_LINE_WIDTH, palette::ANGER)));

    time_axis(&painter, chart.x_scale(), plot, "%b %d");
    value_axis(&painter, chart.left_scale(), plot, plot.left(), true, palette::ANGER);
    value_axis(&painter, chart.right_scale(), plot, plot.right(), false, palette::AXIS_MUTED);
    painter.text(
        pos2(origin.x + 4.0, origin.y + 6.0),
        Align2::LEFT_TOP,
        "Fear Posts Volume",
        FontId::proportional(12.0),
        palette::ANGER,
    );
    painter.text(
        pos2(resp.rect.right() - 4.0, origin.y + 6.0),
        Align2::RIGHT_TOP,
        "Market Volatility",
        FontId::proportional(12.0),
        palette::AXIS_MUTED,
    );

    ui.horizontal(|ui| {
        ui.add_space(ALIGNER_INSETS.left);
        ui.label("Time Shift:");
        let range = state.shift_range_days.max(1);
        let mut days = state.shift_days;
        let resp = ui.add(Slider::new(&mut days, -range..=range).show_value(false));
        if resp.changed() && days != state.shift_days {
            events.push(UiEvent::ShiftChanged { days });
        }
        ui.label(RichText::new(shift_label(state.shift_days)).strong());
    });
}

fn legend(painter: &Painter, at: Pos2) {
    let mut mesh = Mesh::default();
    for (i, (t, _)) in LEGEND_STOPS.iter().enumerate() {
        let x = at.x + LEGEND_WIDTH * t;
        let c = legend_color(*t);
        mesh.colored_vertex(pos2(x, at.y), c);
        mesh.colored_vertex(pos2(x, at.y + LEGEND_HEIGHT), c);
        if i > 0 {
            let k = i as u32 * 2;
            mesh.add_triangle(k - 2, k - 1, k);
            mesh.add_triangle(k - 1, k + 1, k);
        }
    }
    painter.add(mesh);
    let font = FontId::proportional(10.0);
    let y = at.y + LEGEND_HEIGHT + 2.0;
    painter.text(pos2(at.x, y), Align2::LEFT_TOP, "Lower Fear", font.clone(), INK);
    painter.text(pos2(at.x + LEGEND_WIDTH, y), Align2::RIGHT_TOP, "High Fear", font, INK);
}

/// Quads between two sample runs that share x positions.
fn fill_between(top: &[Pos2], bottom: &[Pos2], offset: Vec2, color: Color32) -> Mesh {
    let mut mesh = Mesh::default();
    for (i, (t, b)) in top.iter().zip(bottom).enumerate() {
        mesh.colored_vertex(*t + offset, color);
        mesh.colored_vertex(*b + offset, color);
        if i > 0 {
            let k = i as u32 * 2;
            mesh.add_triangle(k - 2, k - 1, k);
            mesh.add_triangle(k - 1, k + 1, k);
        }
    }
    mesh
}

fn time_axis(painter: &Painter, scale: &TimeScale, plot: Rect, fmt: &str) {
    let stroke = Stroke::new(1.0, palette::AXIS_MUTED);
    let y = plot.bottom();
    painter.line_segment([pos2(plot.left(), y), pos2(plot.right(), y)], stroke);
    let count = ((plot.width() / 80.0) as usize).max(2);
    for t in scale.ticks(count) {
        let x = plot.left() + scale.apply(t);
        if x < plot.left() - 0.5 || x > plot.right() + 0.5 {
            continue;
        }
        painter.line_segment([pos2(x, y), pos2(x, y + TICK_LEN)], stroke);
        painter.text(
            pos2(x, y + TICK_LEN + 1.0),
            Align2::CENTER_TOP,
            TimeScale::format_tick(t, fmt),
            FontId::proportional(10.0),
            palette::AXIS_MUTED,
        );
    }
}

fn value_axis(painter: &Painter, scale: &LinearScale, plot: Rect, x: f32, left: bool, color: Color32) {
    let stroke = Stroke::new(1.0, color);
    painter.line_segment([pos2(x, plot.top()), pos2(x, plot.bottom())], stroke);
    let ticks = scale.ticks(5);
    let decimals = tick_decimals(&ticks);
    let (dx, align) = if left {
        (-TICK_LEN, Align2::RIGHT_CENTER)
    } else {
        (TICK_LEN, Align2::LEFT_CENTER)
    };
    for v in ticks {
        let y = plot.top() + scale.apply(v);
        painter.line_segment([pos2(x, y), pos2(x + dx, y)], stroke);
        painter.text(
            pos2(x + dx * 1.3, y),
            align,
            format!("{v:.decimals$}"),
            FontId::proportional(10.0),
            color,
        );
    }
}

fn tick_decimals(ticks: &[f64]) -> usize {
    match ticks {
        [a, b, ..] => {
            let step = (b - a).abs();
            if step > 0.0 && step < 1.0 {
                (-step.log10().floor()) as usize
            } else {
                0
            }
        }
        _ => 0,
    }
}

type Span = (String, Color32);

fn candle_tip_lines(tip: &CandleTooltip) -> Vec<Vec<Span>> {
    let white = Color32::WHITE;
    vec![
        vec![(tip.date.clone(), white)],
        vec![
            ("Market: ".to_string(), white),
            (tip.trend_text.clone(), tip.trend.color()),
        ],
        vec![(format!("Total Posts: {}", tip.total_posts), white)],
        vec![
            ("Fear Ratio: ".to_string(), white),
            (tip.fear_pct.clone(), palette::FEAR),
        ],
    ]
}

fn stream_tip_lines(tip: &StreamTooltip) -> Vec<Vec<Span>> {
    let white = Color32::WHITE;
    vec![
        vec![(tip.date.clone(), white)],
        vec![(format!("Hype: {}", tip.hype), palette::HYPE)],
        vec![(format!("Fear: {}", tip.fear), palette::FEAR)],
        vec![(format!("Anger: {}", tip.anger), palette::ANGER)],
        vec![(format!("Total Posts: {}", tip.total), white)],
    ]
}

fn candle_tooltip_layer(ctx: &Context, state: &DashState) {
    let visible = state.candle_tip_visible();
    let id = Id::new("candle_tip_alpha");
    let fade = if visible { TIP_FADE_IN } else { TIP_FADE_OUT };
    let alpha = ctx.animate_bool_with_time(id, visible, fade);
    if alpha <= 0.0 {
        return;
    }
    if let Some(tip) = &state.candle_tip {
        let lines = candle_tip_lines(&tip.content);
        draw_tooltip(ctx, "candle_tip", tip.pointer + CANDLE_TIP_OFFSET, &lines, alpha);
    }
}

fn draw_tooltip(ctx: &Context, key: &str, at: Pos2, lines: &[Vec<Span>], alpha: f32) {
    let painter = ctx.layer_painter(LayerId::new(Order::Tooltip, Id::new(key)));
    let font = FontId::proportional(12.0);
    let pad = 8.0;
    let line_h = 16.0;

    let widths: Vec<f32> = lines
        .iter()
        .map(|spans| {
            spans
                .iter()
                .map(|(text, _)| {
                    painter
                        .layout_no_wrap(text.clone(), font.clone(), Color32::WHITE)
                        .size()
                        .x
                })
                .sum()
        })
        .collect();
    let width = widths.iter().copied().fold(0.0, f32::max);
    let bg = Rect::from_min_size(
        at,
        vec2(width + 2.0 * pad, lines.len() as f32 * line_h + 2.0 * pad),
    );
    painter.rect_filled(bg, 4.0, TIP_BG.gamma_multiply(alpha));

    for (row, spans) in lines.iter().enumerate() {
        let mut x = bg.left() + pad;
        let y = bg.top() + pad + row as f32 * line_h;
        for (text, color) in spans {
            let r = painter.text(
                pos2(x, y),
                Align2::LEFT_TOP,
                text,
                font.clone(),
                color.gamma_multiply(alpha),
            );
            x = r.right();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_subtract_insets_with_floor() {
        let l = layouts_for(1000.0);
        assert_eq!(l.candle.width, 1000.0 - 60.0 - 50.0);
        assert_eq!(l.stream.width, 1000.0 - 60.0 - 30.0);
        assert_eq!(l.aligner.width, 1000.0 - 120.0);
        assert_eq!(layouts_for(10.0).candle.width, MIN_PLOT_WIDTH);
    }

    #[test]
    fn tick_label_precision_follows_step() {
        assert_eq!(tick_decimals(&[0.0, 100.0]), 0);
        assert_eq!(tick_decimals(&[0.0, 0.05, 0.1]), 2);
        assert_eq!(tick_decimals(&[0.0, 0.2]), 1);
        assert_eq!(tick_decimals(&[]), 0);
    }

    #[test]
    fn fill_mesh_has_two_triangles_per_gap() {
        let top = [pos2(0.0, 0.0), pos2(5.0, 1.0), pos2(10.0, 0.0)];
        let bot = [pos2(0.0, 9.0), pos2(5.0, 9.0), pos2(10.0, 9.0)];
        let mesh = fill_between(&top, &bot, Vec2::ZERO, Color32::RED);
        assert_eq!(mesh.vertices.len(), 6);
        assert_eq!(mesh.indices.len(), 12);
    }

    #[test]
    fn stream_tip_shows_total_posts() {
        let tip = StreamTooltip {
            date: "Jan 27, 2021".into(),
            hype: 4,
            fear: 2,
            anger: 1,
            total: 7,
        };
        let lines = stream_tip_lines(&tip);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[4][0].0, "Total Posts: 7");
        assert_eq!(lines[2][0], ("Fear: 2".to_string(), palette::FEAR));
    }
}
