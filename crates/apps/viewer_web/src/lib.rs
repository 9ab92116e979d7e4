use console_error_panic_hook::set_once;
use gloo_net::http::Request;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlImageElement;

use foundation::math::Vec2;
use formats::{ExplorerConfig, PaperDocument, TopicIndex, ingest_document};
use render::{Renderer, TierOpacity};
use scene::explorer::{ClickOutcome, Explorer, ExplorerEvent, ExplorerObserver, SelectionTicket};
use scene::paper::Paper;

mod draw;
use draw::{context_2d, draw_frame};

/// Observer notifications, queued while the explorer is borrowed and
/// delivered to JS afterwards so callbacks may call back into the viewer.
#[derive(Debug, Clone)]
enum Notification {
    Pick {
        paper: usize,
        doi: String,
        neighbors: Vec<usize>,
    },
    Deselect,
    Hover {
        paper: Option<usize>,
        title: Option<String>,
    },
    /// The explorer is built and accepts actions.
    Ready {
        papers: usize,
    },
}

#[derive(Default, Clone)]
struct NotificationQueue(Rc<RefCell<Vec<Notification>>>);

impl NotificationQueue {
    fn push(&self, notification: Notification) {
        self.0.borrow_mut().push(notification);
    }

    fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.0.borrow_mut())
    }
}

impl ExplorerObserver for NotificationQueue {
    fn on_pick(&mut self, paper: usize, record: &Paper, neighbors: &[usize]) {
        self.push(Notification::Pick {
            paper,
            doi: record.doi.clone(),
            neighbors: neighbors.to_vec(),
        });
    }

    fn on_deselect(&mut self) {
        self.push(Notification::Deselect);
    }

    fn on_hover(&mut self, hovered: Option<(usize, &Paper)>) {
        self.push(Notification::Hover {
            paper: hovered.map(|(i, _)| i),
            title: hovered.and_then(|(_, p)| p.title.clone()),
        });
    }
}

#[derive(Default)]
struct Callbacks {
    on_pick: Option<js_sys::Function>,
    on_deselect: Option<js_sys::Function>,
    on_hover: Option<js_sys::Function>,
    on_ready: Option<js_sys::Function>,
}

#[derive(Default)]
struct ViewerState {
    canvas_id: String,
    canvas_width: f64,
    canvas_height: f64,
    explorer: Option<Explorer>,
    topics: TopicIndex,
    atlas: Option<HtmlImageElement>,
    atlas_ready: bool,
    pending: Option<SelectionTicket>,
    last_pointer: Option<Vec2>,
    panning: bool,
    queue: NotificationQueue,
    callbacks: Callbacks,
}

thread_local! {
    static STATE: RefCell<ViewerState> = RefCell::new(ViewerState {
        canvas_id: "explorer-canvas".to_string(),
        canvas_width: 1280.0,
        canvas_height: 720.0,
        ..ViewerState::default()
    });
}

fn log(msg: &str) {
    web_sys::console::log_1(&JsValue::from_str(msg));
}

/// Runs `f` against the explorer, then delivers queued notifications.
fn with_explorer<R: Default>(f: impl FnOnce(&mut ViewerState, &mut Explorer) -> R) -> R {
    let out = STATE.with(|state| {
        let mut s = state.borrow_mut();
        let Some(mut explorer) = s.explorer.take() else {
            return R::default();
        };
        let out = f(&mut *s, &mut explorer);
        s.explorer = Some(explorer);
        out
    });
    deliver_notifications();
    out
}

fn deliver_notifications() {
    let (pending, on_pick, on_deselect, on_hover, on_ready) = STATE.with(|state| {
        let s = state.borrow();
        (
            s.queue.take(),
            s.callbacks.on_pick.clone(),
            s.callbacks.on_deselect.clone(),
            s.callbacks.on_hover.clone(),
            s.callbacks.on_ready.clone(),
        )
    });

    for n in pending {
        let result = match n {
            Notification::Pick {
                paper,
                doi,
                neighbors,
            } => on_pick.as_ref().map(|f| {
                let ids: js_sys::Array = neighbors
                    .iter()
                    .map(|&i| JsValue::from_f64(i as f64))
                    .collect();
                f.call3(
                    &JsValue::NULL,
                    &JsValue::from_f64(paper as f64),
                    &JsValue::from_str(&doi),
                    &ids,
                )
            }),
            Notification::Deselect => on_deselect.as_ref().map(|f| f.call0(&JsValue::NULL)),
            Notification::Hover { paper, title } => on_hover.as_ref().map(|f| {
                let index = paper.map_or(JsValue::NULL, |i| JsValue::from_f64(i as f64));
                let title = title.map_or(JsValue::NULL, |t| JsValue::from_str(&t));
                f.call2(&JsValue::NULL, &index, &title)
            }),
            Notification::Ready { papers } => on_ready
                .as_ref()
                .map(|f| f.call1(&JsValue::NULL, &JsValue::from_f64(papers as f64))),
        };
        if let Some(Err(err)) = result {
            log(&format!("explorer callback failed: {err:?}"));
        }
    }
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    set_once();
    Ok(())
}

/// Registers observers, loads the embedding document and atlas image and
/// builds the explorer. `config_json` may be empty for defaults.
///
/// `on_ready(paper_count)` fires once the explorer accepts actions; deep
/// links such as `select_doi` or `add_topic` belong there, earlier calls
/// are dropped.
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn init_explorer(
    canvas_id: String,
    document_url: String,
    atlas_url: String,
    config_json: String,
    on_pick: Option<js_sys::Function>,
    on_deselect: Option<js_sys::Function>,
    on_hover: Option<js_sys::Function>,
    on_ready: Option<js_sys::Function>,
) {
    STATE.with(|state| {
        let mut s = state.borrow_mut();
        s.canvas_id = canvas_id;
        s.callbacks = Callbacks {
            on_pick,
            on_deselect,
            on_hover,
            on_ready,
        };
    });
    load_atlas(&atlas_url);

    spawn_local(async move {
        if let Err(err) = build_explorer(&document_url, &config_json).await {
            log(&format!("explorer init error: {err:?}"));
        }
    });
}

async fn build_explorer(document_url: &str, config_json: &str) -> Result<(), JsValue> {
    let text = fetch_text(document_url).await?;
    install_explorer(&text, config_json).map_err(|e| JsValue::from_str(&e))?;
    let drawn = render_now();
    deliver_notifications();
    drawn
}

/// Builds the explorer from a fetched document and queues the ready
/// notification. Returns the number of papers shown.
fn install_explorer(document_text: &str, config_json: &str) -> Result<usize, String> {
    let config = if config_json.trim().is_empty() {
        ExplorerConfig::default()
    } else {
        ExplorerConfig::from_json_str(config_json).map_err(|e| e.to_string())?
    };
    let options = config.to_options().map_err(|e| e.to_string())?;

    let document = PaperDocument::from_json_str(document_text).map_err(|e| e.to_string())?;
    let loaded = ingest_document(&document);
    if !loaded.report.is_clean() {
        log(&format!(
            "skipped {} of {} paper records",
            loaded.report.skipped.len(),
            document.papers.len()
        ));
    }

    let papers = loaded.papers.len();
    STATE.with(|state| {
        let mut s = state.borrow_mut();
        let observer = Box::new(s.queue.clone());
        let mut explorer = Explorer::new(loaded.papers, loaded.means, options, observer);
        explorer.initialize(s.canvas_width, s.canvas_height);
        s.explorer = Some(explorer);
        s.queue.push(Notification::Ready { papers });
    });
    Ok(papers)
}

fn load_atlas(url: &str) {
    let img = match HtmlImageElement::new() {
        Ok(img) => img,
        Err(err) => {
            log(&format!("atlas image unavailable: {err:?}"));
            return;
        }
    };

    let on_load = Closure::<dyn FnMut()>::new(|| {
        STATE.with(|state| state.borrow_mut().atlas_ready = true);
        let _ = render_now();
    });
    let failed_url = url.to_string();
    let on_error = Closure::<dyn FnMut()>::new(move || {
        log(&format!("atlas image failed to load: {failed_url}; drawing flat quads"));
    });
    img.set_onload(Some(on_load.as_ref().unchecked_ref()));
    img.set_onerror(Some(on_error.as_ref().unchecked_ref()));
    on_load.forget();
    on_error.forget();
    img.set_src(url);

    STATE.with(|state| {
        let mut s = state.borrow_mut();
        s.atlas = Some(img);
        s.atlas_ready = false;
    });
}

/// Loads the topic index used by `add_topic`.
#[wasm_bindgen]
pub fn load_topics(url: String) {
    spawn_local(async move {
        let result = fetch_text(&url)
            .await
            .and_then(|text| {
                TopicIndex::from_json_str(&text).map_err(|e| JsValue::from_str(&e.to_string()))
            });
        match result {
            Ok(index) => STATE.with(|state| state.borrow_mut().topics = index),
            Err(err) => log(&format!("Failed to fetch topics: {err:?}")),
        }
    });
}

#[wasm_bindgen]
pub fn set_canvas_size(width: f64, height: f64) -> Result<(), JsValue> {
    STATE.with(|state| {
        let mut s = state.borrow_mut();
        s.canvas_width = width;
        s.canvas_height = height;
    });
    with_explorer(|_, ex| ex.set_viewport(width, height));
    render_now()
}

#[wasm_bindgen]
pub fn pointer_down(x: f64, y: f64) {
    with_explorer(|s, ex| {
        let at = Vec2::new(x, y);
        ex.pointer_down(at);
        s.last_pointer = Some(at);
        s.panning = true;
    });
}

/// Returns `true` when the release picked a paper. The caller fetches its
/// details and then calls `finish_selection`.
#[wasm_bindgen]
pub fn pointer_up(x: f64, y: f64) -> bool {
    with_explorer(|s, ex| {
        s.panning = false;
        s.last_pointer = None;
        match ex.pointer_up(Vec2::new(x, y)) {
            ClickOutcome::Picked(ticket) => {
                s.pending = Some(ticket);
                true
            }
            ClickOutcome::Deselected | ClickOutcome::Drag | ClickOutcome::Dropped => false,
        }
    })
}

/// Pans while a button is held, hover-tests otherwise.
#[wasm_bindgen]
pub fn pointer_move(x: f64, y: f64) {
    with_explorer(|s, ex| {
        let at = Vec2::new(x, y);
        if s.panning {
            if let Some(prev) = s.last_pointer {
                ex.pan(at.x - prev.x, at.y - prev.y);
            }
            s.last_pointer = Some(at);
        } else {
            ex.hover(at);
        }
    });
}

#[wasm_bindgen]
pub fn wheel(delta_y: f64) {
    with_explorer(|_, ex| {
        ex.dolly(-delta_y / 100.0);
    });
}

/// Pan multiplier, for pan sliders and touch mode. Negative values are
/// ignored.
#[wasm_bindgen]
pub fn set_pan_speed(speed: f64) -> bool {
    with_explorer(|_, ex| ex.set_pan_speed(speed))
}

/// World units per wheel step. Negative values are ignored.
#[wasm_bindgen]
pub fn set_zoom_speed(speed: f64) -> bool {
    with_explorer(|_, ex| ex.set_zoom_speed(speed))
}

/// Dois of the paper picked last and its neighbors, for the detail fetch.
#[wasm_bindgen]
pub fn selection_dois() -> Vec<String> {
    STATE.with(|state| {
        state
            .borrow()
            .pending
            .as_ref()
            .map(|t| t.dois.clone())
            .unwrap_or_default()
    })
}

#[wasm_bindgen]
pub fn finish_selection() -> bool {
    with_explorer(|s, ex| match s.pending.take() {
        Some(ticket) => ex.finish_selection(ticket),
        None => false,
    })
}

#[wasm_bindgen]
pub fn select_doi(doi: String) -> bool {
    with_explorer(|s, ex| match ex.select_paper_by_doi(&doi) {
        Some(ticket) => {
            s.pending = Some(ticket);
            true
        }
        None => false,
    })
}

#[wasm_bindgen]
pub fn select_category(name: String) -> bool {
    with_explorer(|_, ex| ex.select_category(&name))
}

#[wasm_bindgen]
pub fn add_topic(topic_id: String) -> bool {
    with_explorer(|s, ex| match s.topics.get(&topic_id) {
        Some(dois) => ex.add_topic(&topic_id, dois.to_vec()),
        None => {
            log(&format!("unknown topic: {topic_id}"));
            false
        }
    })
}

#[wasm_bindgen]
pub fn remove_topic(topic_id: String) -> bool {
    with_explorer(|_, ex| ex.remove_topic(&topic_id))
}

#[wasm_bindgen]
pub fn deselect_all() -> bool {
    with_explorer(|_, ex| ex.deselect_all())
}

/// `requestAnimationFrame` hook. Returns whether anything was drawn.
#[wasm_bindgen]
pub fn frame(time_ms: f64) -> Result<bool, JsValue> {
    let redraw = with_explorer(|_, ex| ex.tick(time_ms));
    if redraw {
        render_now()?;
    }
    Ok(redraw)
}

/// Frame-stamped explorer events since the last call, as JSON strings.
#[wasm_bindgen]
pub fn drain_events() -> Vec<String> {
    with_explorer(|_, ex| {
        ex.drain_events()
            .into_iter()
            .map(|e| {
                let payload = match e.payload {
                    ExplorerEvent::Picked {
                        paper,
                        doi,
                        neighbors,
                    } => serde_json::json!({
                        "type": "picked", "paper": paper, "doi": doi, "neighbors": neighbors
                    }),
                    ExplorerEvent::Deselected => serde_json::json!({ "type": "deselected" }),
                    ExplorerEvent::Hovered { paper } => {
                        serde_json::json!({ "type": "hovered", "paper": paper })
                    }
                };
                serde_json::json!({ "frame": e.frame_index, "event": payload }).to_string()
            })
            .collect()
    })
}

fn render_now() -> Result<(), JsValue> {
    STATE.with(|state| {
        let s = state.borrow();
        let Some(explorer) = &s.explorer else {
            return Ok(());
        };
        let (canvas, ctx) = context_2d(&s.canvas_id)?;
        let frame = Renderer::collect(
            explorer.mesh(),
            explorer.camera(),
            explorer.selection().is_active(),
            TierOpacity::default(),
        );
        let atlas = s.atlas.as_ref().filter(|_| s.atlas_ready);
        draw_frame(&canvas, &ctx, &frame, atlas)
    })
}

async fn fetch_text(url: &str) -> Result<String, JsValue> {
    let resp = Request::get(url)
        .send()
        .await
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    resp.text()
        .await
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{Notification, STATE, install_explorer, set_pan_speed};

    const DOCUMENT: &str = include_str!("../assets/embeddings_3d.json");

    #[test]
    fn installed_explorer_queues_one_ready_signal() {
        let papers = install_explorer(DOCUMENT, "").expect("install");
        assert!(papers > 0);

        let queued = STATE.with(|state| state.borrow().queue.take());
        assert_eq!(queued.len(), 1);
        assert!(matches!(queued[0], Notification::Ready { papers: n } if n == papers));
        assert!(STATE.with(|state| state.borrow().explorer.is_some()));
        assert!(set_pan_speed(0.25));
        assert!(!set_pan_speed(-1.0));
    }

    #[test]
    fn invalid_config_builds_nothing() {
        let err = install_explorer(DOCUMENT, r#"{"camera": {"view_offset": 0}}"#)
            .expect_err("degenerate camera");
        assert!(err.contains("camera.view_offset"));
        assert!(STATE.with(|state| state.borrow().explorer.is_none()));
        assert!(!set_pan_speed(0.25));
    }
}
