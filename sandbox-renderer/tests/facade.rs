//! Integration tests for backend switching through the façade.

use std::rc::Rc;

use sandbox_core::{Point, Rgba};
use sandbox_renderer::{
    backend::{
        canvas2d::{ANIMATION_SURFACE_ID, MAIN_SURFACE_ID},
        retained::RETAINED_SURFACE_ID,
        webgl::GL_SURFACE_ID,
    },
    headless::HeadlessHost,
    host::PointerInput,
    stage::DisplayObject,
    BackendType, CanvasManager, RenderError, RendererConfig,
};

fn host() -> Rc<HeadlessHost> {
    Rc::new(HeadlessHost::new(640.0, 480.0))
}

// ============================================================================
// Switching
// ============================================================================

#[test]
fn only_one_backend_is_ever_live() {
    let host = host();
    let mut manager = CanvasManager::new(Rc::clone(&host));

    manager.switch_to_2d().unwrap();
    let mut live = host.live_surfaces();
    live.sort();
    assert_eq!(live, vec![ANIMATION_SURFACE_ID.to_string(), MAIN_SURFACE_ID.to_string()]);

    manager.switch_to_webgl().unwrap();
    assert_eq!(host.live_surfaces(), vec![GL_SURFACE_ID.to_string()]);

    manager.switch_to_2d().unwrap();
    assert!(!host.live_surfaces().contains(&GL_SURFACE_ID.to_string()));
    assert_eq!(host.frames().queued(), 0);
}

#[tokio::test]
async fn retained_switch_is_async_and_exclusive() {
    let host = host();
    let mut manager = CanvasManager::new(Rc::clone(&host));
    manager.switch_to_webgl().unwrap();
    manager.switch_to_retained().await.unwrap();

    assert_eq!(manager.active_backend(), Some(BackendType::Retained));
    assert_eq!(host.live_surfaces(), vec![RETAINED_SURFACE_ID.to_string()]);
    // Only the retained loop is scheduled.
    assert_eq!(host.frames().queued(), 1);
}

#[tokio::test]
async fn retained_failure_leaves_facade_empty() {
    let host = host();
    host.set_gpu_available(false);
    let mut manager = CanvasManager::new(Rc::clone(&host));
    manager.switch_to_2d().unwrap();

    let err = manager.set_renderer(BackendType::Retained).await.unwrap_err();
    assert!(matches!(err, RenderError::GpuInit(_)));
    assert!(manager.active_backend().is_none());
    assert!(host.live_surfaces().is_empty());
}

// ============================================================================
// Backend Behaviour Through The Façade
// ============================================================================

#[test]
fn webgl_shader_failure_is_inert_but_active() {
    let host = host();
    host.fail_shader_compilation(true);
    let mut manager = CanvasManager::new(Rc::clone(&host));
    manager.switch_to_webgl().unwrap();

    let webgl = manager.webgl().unwrap();
    assert!(webgl.is_inert());
    assert!(webgl.pipeline_error().is_some());
    manager.render().unwrap();
    host.advance(16.0);
    assert_eq!(host.gl(GL_SURFACE_ID).unwrap().draw_calls(), 0);
}

#[test]
fn webgl_camera_follows_pointer() {
    let host = host();
    let mut manager = CanvasManager::new(Rc::clone(&host));
    manager.switch_to_webgl().unwrap();
    let gl = host.gl(GL_SURFACE_ID).unwrap();
    let before = gl.uniform("uView").unwrap();

    host.pointer(GL_SURFACE_ID, PointerInput::Drag { dx: 30.0, dy: 10.0 });
    host.advance(16.0);
    assert_ne!(gl.uniform("uView").unwrap(), before);
}

#[tokio::test]
async fn retained_stage_edits_show_next_frame() {
    let host = host();
    let config = RendererConfig::from_json(r#"{"canvas":{"backgroundColor":"white"}}"#).unwrap();
    let mut manager = CanvasManager::with_config(Rc::clone(&host), config);
    manager.switch_to_retained().await.unwrap();

    let presenter = host.presenter(RETAINED_SURFACE_ID).unwrap();
    assert_eq!(presenter.last_clear(), Some([1.0, 1.0, 1.0, 1.0]));
    assert_eq!(presenter.last_frame().unwrap().len(), 0);

    manager
        .retained()
        .unwrap()
        .stage_mut()
        .unwrap()
        .add(DisplayObject::line(
            Point::new(-100.0, 0.0),
            Point::new(100.0, 0.0),
            2.0,
            Rgba::BLACK,
        ));
    host.advance(16.0);
    assert_eq!(presenter.last_frame().unwrap().len(), 6);
}

#[test]
fn resize_passthrough_pins_size() {
    let host = host();
    let mut manager = CanvasManager::new(Rc::clone(&host));
    manager.switch_to_webgl().unwrap();
    manager.resize(300, 200).unwrap();
    assert_eq!(manager.webgl().unwrap().css_size(), (300.0, 200.0));
    assert!(host
        .gl(GL_SURFACE_ID)
        .unwrap()
        .calls()
        .contains(&sandbox_renderer::headless::GlCall::SetPixelSize(300, 200)));
}
