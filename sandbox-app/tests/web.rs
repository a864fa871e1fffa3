//! Browser tests for the JS-facing sandbox.
//!
//! Run with `wasm-pack test --headless --chrome sandbox-app`.

#![cfg(target_arch = "wasm32")]

use sandbox_app::CanvasSandbox;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;
use web_sys::HtmlElement;

wasm_bindgen_test_configure!(run_in_browser);

/// Append a sized container to the page body.
fn container(id: &str) -> HtmlElement {
    let document = web_sys::window().unwrap().document().unwrap();
    let element: HtmlElement = document.create_element("div").unwrap().dyn_into().unwrap();
    element.set_id(id);
    let style = element.style();
    style.set_property("width", "400px").unwrap();
    style.set_property("height", "300px").unwrap();
    document.body().unwrap().append_child(&element).unwrap();
    element
}

fn element_exists(id: &str) -> bool {
    let document = web_sys::window().unwrap().document().unwrap();
    document.get_element_by_id(id).is_some()
}

// ============================================================================
// Construction and backend selection
// ============================================================================

#[wasm_bindgen_test]
fn missing_container_is_an_error() {
    assert!(CanvasSandbox::new("no-such-container", None).is_err());
}

#[wasm_bindgen_test]
fn malformed_config_is_an_error() {
    container("bad-config");
    assert!(CanvasSandbox::new("bad-config", Some("{oops".to_string())).is_err());
}

#[wasm_bindgen_test]
fn switch_to_2d_attaches_visible_layers() {
    let element = container("switch-2d");
    let sandbox = CanvasSandbox::new("switch-2d", None).unwrap();
    assert_eq!(sandbox.active_backend(), None);

    sandbox.switch_to_2d().unwrap();

    assert_eq!(sandbox.active_backend().as_deref(), Some("2d"));
    // Main and animation layers; the offscreen layer stays detached.
    assert_eq!(element.child_element_count(), 2);
    assert!(element_exists("sandbox-main"));
    assert!(!element_exists("sandbox-offscreen"));

    sandbox.destroy();
    assert_eq!(element.child_element_count(), 0);
    assert_eq!(sandbox.active_backend(), None);
}

#[wasm_bindgen_test]
fn switching_away_from_2d_removes_its_canvases() {
    let element = container("switch-gl");
    let sandbox = CanvasSandbox::new("switch-gl", None).unwrap();
    sandbox.switch_to_2d().unwrap();

    match sandbox.switch_to_webgl() {
        Ok(()) => {
            assert_eq!(sandbox.active_backend().as_deref(), Some("webgl"));
            assert_eq!(element.child_element_count(), 1);
            assert!(element_exists("sandbox-webgl"));
        }
        Err(_) => {
            // Browsers without WebGL end up with nothing active.
            assert_eq!(sandbox.active_backend(), None);
            assert_eq!(element.child_element_count(), 0);
        }
    }
    assert!(!element_exists("sandbox-main"));
    sandbox.destroy();
}

// ============================================================================
// 2D drawing
// ============================================================================

#[wasm_bindgen_test]
fn drawing_requires_the_2d_backend() {
    container("no-2d");
    let sandbox = CanvasSandbox::new("no-2d", None).unwrap();
    assert!(sandbox.draw_point(0.0, 0.0, None).is_err());
    assert!(sandbox.clear().is_err());
}

#[wasm_bindgen_test]
fn drawing_parses_options() {
    container("draw-options");
    let sandbox = CanvasSandbox::new("draw-options", None).unwrap();
    sandbox.switch_to_2d().unwrap();

    let options = Some(r##"{"color":"#006400","lineWidth":3}"##.to_string());
    sandbox.draw_line(-50.0, 0.0, 50.0, 0.0, options.clone()).unwrap();
    sandbox.draw_rect(-10.0, -10.0, 20.0, 20.0, options).unwrap();
    sandbox.draw_arc(0.0, 0.0, 20.0, 0.0, std::f64::consts::PI, None).unwrap();
    assert!(sandbox
        .draw_point(0.0, 0.0, Some("not json".to_string()))
        .is_err());
    sandbox.destroy();
}

#[wasm_bindgen_test]
async fn animate_line_promise_resolves() {
    container("animate-line");
    let sandbox = CanvasSandbox::new("animate-line", None).unwrap();
    sandbox.switch_to_2d().unwrap();

    let promise = sandbox
        .draw_animate_line(-100.0, 0.0, 100.0, 0.0, None, 50.0)
        .unwrap();
    JsFuture::from(promise).await.unwrap();
    sandbox.destroy();
}

#[wasm_bindgen_test]
async fn destroy_resolves_running_animations() {
    container("destroy-running");
    let sandbox = CanvasSandbox::new("destroy-running", None).unwrap();
    sandbox.switch_to_2d().unwrap();

    let promise = sandbox
        .move_lines(
            r#"[{"start":{"x":-100,"y":0},"end":{"x":100,"y":0}}]"#,
            None,
            60_000.0,
            vec![50.0],
        )
        .unwrap();
    sandbox.destroy();
    JsFuture::from(promise).await.unwrap();
}
