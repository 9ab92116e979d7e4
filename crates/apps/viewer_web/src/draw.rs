use render::{QuadDraw, RenderFrame};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

pub fn context_2d(
    canvas_id: &str,
) -> Result<(HtmlCanvasElement, CanvasRenderingContext2d), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("window missing"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("document missing"))?;
    let canvas = document
        .get_element_by_id(canvas_id)
        .ok_or_else(|| JsValue::from_str("canvas missing"))?
        .dyn_into::<HtmlCanvasElement>()?;
    let ctx = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
        .dyn_into::<CanvasRenderingContext2d>()?;
    Ok((canvas, ctx))
}

/// Paints a collected frame. Without an atlas image the quads are filled
/// with their face color only.
pub fn draw_frame(
    canvas: &HtmlCanvasElement,
    ctx: &CanvasRenderingContext2d,
    frame: &RenderFrame,
    atlas: Option<&HtmlImageElement>,
) -> Result<(), JsValue> {
    ctx.clear_rect(0.0, 0.0, canvas.width() as f64, canvas.height() as f64);
    for quad in &frame.draws {
        draw_quad(ctx, quad, atlas)?;
    }
    ctx.set_global_alpha(1.0);
    ctx.set_global_composite_operation("source-over")?;
    Ok(())
}

fn draw_quad(
    ctx: &CanvasRenderingContext2d,
    quad: &QuadDraw,
    atlas: Option<&HtmlImageElement>,
) -> Result<(), JsValue> {
    let (x, y, w, h) = quad.screen_rect();
    ctx.set_global_alpha(quad.opacity);
    let fill = quad.color.to_string();

    match atlas {
        Some(img) => {
            let iw = img.natural_width() as f64;
            let ih = img.natural_height() as f64;
            // Texture v runs bottom-up; image rows run top-down.
            let sx = quad.uv.u0 * iw;
            let sy = (1.0 - quad.uv.v1) * ih;
            let sw = (quad.uv.u1 - quad.uv.u0) * iw;
            let sh = (quad.uv.v1 - quad.uv.v0) * ih;
            ctx.set_global_composite_operation("source-over")?;
            ctx.draw_image_with_html_image_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                img, sx, sy, sw, sh, x, y, w, h,
            )?;
            ctx.set_global_composite_operation("multiply")?;
            ctx.set_fill_style_str(&fill);
            ctx.fill_rect(x, y, w, h);
        }
        None => {
            ctx.set_global_composite_operation("source-over")?;
            ctx.set_fill_style_str(&fill);
            ctx.fill_rect(x, y, w, h);
        }
    }
    Ok(())
}
