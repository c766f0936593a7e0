use super::event::*;
use super::state::*;
use crate::chart::candle::candle_tooltip;
use crate::chart::stream::stream_tooltip;
use crate::comments::show_comments_for_date;
use crate::data::Dataset;
use std::sync::Arc;
use tracing::{debug, error};

/// Apply one event; returns whether anything visible changed.
pub fn reduce(state: &mut DashState, ev: AppEvent) -> bool {
    match ev {
        AppEvent::Ui(u) => reduce_ui(state, u),
        AppEvent::DatasetLoaded { dataset } => {
            debug!(records = dataset.records.len(), "installing dataset");
            state.install(dataset);
            true
        }
        AppEvent::LoadFailed { message } => {
            error!(%message, "market data unavailable; showing empty charts");
            state.install(Arc::new(Dataset::default()));
            state.load_error = Some(message);
            true
        }
    }
}

fn reduce_ui(state: &mut DashState, ev: UiEvent) -> bool {
    let dataset = state.dataset.clone();
    let records = &dataset.records;

    match ev {
        UiEvent::Resized {
            candle,
            stream,
            aligner,
        } => {
            let next = Layouts {
                candle,
                stream,
                aligner,
            };
            if state.layouts() == next {
                return false;
            }
            state.candle.set_layout(records, candle);
            state.stream.set_layout(stream);
            state.aligner.set_layout(aligner);
            // guide x was computed on the old scale
            state.stream_hover = None;
            true
        }

        UiEvent::BrushChanged { selection_px } => {
            if state.candle.selection_px() == selection_px {
                return false;
            }
            state.candle.brush(records, selection_px);
            true
        }

        UiEvent::CandleHovered { index, pointer } => {
            let Some(record) = records.get(index) else {
                return false;
            };
            let tip = Anchored {
                content: candle_tooltip(record),
                pointer,
            };
            if state.hovered_candle == Some(index) && state.candle_tip.as_ref() == Some(&tip) {
                return false;
            }
            if state.hovered_candle != Some(index) {
                state.panel = show_comments_for_date(&dataset.comments, record.date);
            }
            state.hovered_candle = Some(index);
            state.candle_tip = Some(tip);
            true
        }

        UiEvent::CandleLeft => {
            // tooltip content stays for the fade-out
            state.hovered_candle.take().is_some()
        }

        UiEvent::StreamHovered { x_px, pointer } => {
            let Some((index, guide_x)) = state.stream.hover(records, x_px) else {
                return false;
            };
            let next = StreamHover {
                index,
                guide_x,
                tip: Anchored {
                    content: stream_tooltip(&records[index]),
                    pointer,
                },
            };
            if state.stream_hover.as_ref() == Some(&next) {
                return false;
            }
            if state.stream_hover.as_ref().map(|h| h.index) != Some(index) {
                state.panel = show_comments_for_date(&dataset.comments, records[index].date);
            }
            state.stream_hover = Some(next);
            true
        }

        UiEvent::StreamLeft => state.stream_hover.take().is_some(),

        UiEvent::ShiftChanged { days } => {
            let r = state.shift_range_days.max(1);
            let days = days.clamp(-r, r);
            if state.shift_days == days {
                return false;
            }
            state.shift_days = days;
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comments::PanelBody;
    use crate::data::{Comment, DailyRecord};
    use chrono::NaiveDate;
    use egui::pos2;

    fn rec(day: u32) -> DailyRecord {
        DailyRecord {
            date: NaiveDate::from_ymd_opt(2021, 1, day).unwrap(),
            open: 10.0,
            high: 12.0 + day as f64,
            low: 9.0,
            close: 11.0,
            volatility: 0.1,
            fear_ratio: 0.55,
            hype: day,
            fear: 2,
            anger: 1,
            noise: 0,
        }
    }

    fn loaded() -> DashState {
        let dataset = Dataset {
            records: (1..=5).map(rec).collect(),
            comments: vec![Comment {
                date: "2021-01-02".into(),
                sentiment_label: "fear".into(),
                score: 5,
                body: "oh no".into(),
            }],
        };
        let mut state = DashState::default();
        assert!(reduce(
            &mut state,
            AppEvent::DatasetLoaded {
                dataset: Arc::new(dataset)
            }
        ));
        state
    }

    #[test]
    fn load_installs_dataset() {
        let state = loaded();
        assert!(!state.loading);
        assert_eq!(state.candle.visible().len(), 5);
        assert_eq!(state.panel, crate::comments::CommentPanelView::default());
    }

    #[test]
    fn load_failure_leaves_empty_charts() {
        let mut state = DashState::default();
        reduce(
            &mut state,
            AppEvent::LoadFailed {
                message: "missing".into(),
            },
        );
        assert!(!state.loading);
        assert!(state.dataset.is_empty());
        assert_eq!(state.load_error.as_deref(), Some("missing"));
        assert!(!reduce(
            &mut state,
            AppEvent::Ui(UiEvent::StreamHovered {
                x_px: 10.0,
                pointer: pos2(0.0, 0.0)
            })
        ));
    }

    #[test]
    fn candle_hover_updates_panel_and_fades_on_leave() {
        let mut state = loaded();
        reduce(
            &mut state,
            AppEvent::Ui(UiEvent::CandleHovered {
                index: 1,
                pointer: pos2(100.0, 50.0),
            }),
        );
        assert_eq!(state.panel.header, "Jan 02, 2021");
        assert_eq!(state.panel.items().len(), 1);
        assert!(state.candle_tip_visible());

        assert!(reduce(&mut state, AppEvent::Ui(UiEvent::CandleLeft)));
        assert!(!state.candle_tip_visible());
        assert!(state.candle_tip.is_some());
        assert_eq!(state.panel.items().len(), 1);

        reduce(
            &mut state,
            AppEvent::Ui(UiEvent::CandleHovered {
                index: 3,
                pointer: pos2(0.0, 0.0),
            }),
        );
        assert_eq!(state.panel.body, PanelBody::Empty);
    }

    #[test]
    fn stream_hover_without_pair_keeps_prior_state() {
        let mut state = loaded();
        let width = state.stream.layout().width;
        reduce(
            &mut state,
            AppEvent::Ui(UiEvent::StreamHovered {
                x_px: width * 0.25,
                pointer: pos2(1.0, 1.0),
            }),
        );
        let before = state.stream_hover.clone();
        let hover = before.as_ref().unwrap();
        assert_eq!(hover.index, 1);
        assert_eq!(hover.tip.content.total, 5);

        // past the last record there is no straddling pair
        assert!(!reduce(
            &mut state,
            AppEvent::Ui(UiEvent::StreamHovered {
                x_px: width + 40.0,
                pointer: pos2(2.0, 2.0),
            })
        ));
        assert_eq!(state.stream_hover, before);

        assert!(reduce(&mut state, AppEvent::Ui(UiEvent::StreamLeft)));
        assert!(state.stream_hover.is_none());
    }

    #[test]
    fn resting_pointer_reports_no_change() {
        let mut state = loaded();
        let stream = UiEvent::StreamHovered {
            x_px: 200.0,
            pointer: pos2(200.0, 40.0),
        };
        assert!(reduce(&mut state, AppEvent::Ui(stream.clone())));
        let before = state.stream_hover.clone();
        assert!(!reduce(&mut state, AppEvent::Ui(stream)));
        assert_eq!(state.stream_hover, before);

        let candle = UiEvent::CandleHovered {
            index: 2,
            pointer: pos2(80.0, 90.0),
        };
        assert!(reduce(&mut state, AppEvent::Ui(candle.clone())));
        assert!(!reduce(&mut state, AppEvent::Ui(candle)));

        // same candle, pointer moved: the tooltip follows
        assert!(reduce(
            &mut state,
            AppEvent::Ui(UiEvent::CandleHovered {
                index: 2,
                pointer: pos2(81.0, 90.0),
            })
        ));
        assert_eq!(state.candle_tip.as_ref().unwrap().pointer, pos2(81.0, 90.0));
    }

    #[test]
    fn brush_round_trip_restores_full_domain() {
        let mut state = loaded();
        let full = state.candle.full_domain();
        reduce(
            &mut state,
            AppEvent::Ui(UiEvent::BrushChanged {
                selection_px: Some((100.0, 300.0)),
            }),
        );
        assert_ne!(state.candle.focus_domain(), full);
        reduce(
            &mut state,
            AppEvent::Ui(UiEvent::BrushChanged { selection_px: None }),
        );
        assert_eq!(state.candle.focus_domain(), full);
    }

    #[test]
    fn shift_is_clamped_and_survives_reload() {
        let mut state = loaded();
        reduce(&mut state, AppEvent::Ui(UiEvent::ShiftChanged { days: 40 }));
        assert_eq!(state.shift_days, 10);
        assert!(!reduce(&mut state, AppEvent::Ui(UiEvent::ShiftChanged { days: 10 })));
        reduce(
            &mut state,
            AppEvent::DatasetLoaded {
                dataset: Arc::new(Dataset::default()),
            },
        );
        assert_eq!(state.shift_days, 10);
    }

    #[test]
    fn resize_rebuilds_scales() {
        let mut state = loaded();
        let mut layouts = state.layouts();
        layouts.aligner.width = 400.0;
        assert!(reduce(
            &mut state,
            AppEvent::Ui(UiEvent::Resized {
                candle: layouts.candle,
                stream: layouts.stream,
                aligner: layouts.aligner,
            })
        ));
        // 4 day span over 400px
        assert!((state.aligner.pixel_per_day() - 100.0).abs() < 1e-3);
        assert!(!reduce(
            &mut state,
            AppEvent::Ui(UiEvent::Resized {
                candle: layouts.candle,
                stream: layouts.stream,
                aligner: layouts.aligner,
            })
        ));
    }
}
