use collate_render_core::utils::{flip_y, Placement};
use collate_render_core::{DrawOp, Picture};
use collate_types::{Color, Rect};
use lopdf::content::{Content, Operation};
use lopdf::Object;

/// The resource name every text operation selects.
pub const BODY_FONT: &str = "F1";

/// Converts a composed page into a content stream, flattening nested
/// subframes into clipped groups.
pub fn render_picture_to_content(picture: &Picture) -> Content {
    let mut ops = Vec::new();
    push_picture_ops(&mut ops, picture, Placement::identity(), picture.size.height);
    Content { operations: ops }
}

fn push_picture_ops(ops: &mut Vec<Operation>, picture: &Picture, placement: Placement, page_height: f32) {
    for op in &picture.ops {
        match op {
            DrawOp::FillRect { rect, color } => {
                ops.push(fill_color(color));
                ops.push(rectangle(placement.map_rect(*rect), page_height));
                ops.push(Operation::new("f", vec![]));
            }
            DrawOp::Text { x, y, font_size, color, text } => {
                if text.is_empty() {
                    continue;
                }
                let size = font_size * placement.sy;
                // Baseline sits at 80% of the em box below the recorded top.
                let (px, py) = placement.map_point(*x, *y + font_size * 0.8);
                ops.push(Operation::new("BT", vec![]));
                ops.push(fill_color(color));
                ops.push(Operation::new("Tf", vec![BODY_FONT.into(), size.into()]));
                ops.push(Operation::new("Td", vec![px.into(), flip_y(py, page_height).into()]));
                ops.push(Operation::new("Tj", vec![Object::string_literal(text.as_str())]));
                ops.push(Operation::new("ET", vec![]));
            }
            DrawOp::Subframe { bounds, picture: nested } => {
                if nested.is_blank() || bounds.is_empty() {
                    continue;
                }
                let clip = placement.map_rect(*bounds);
                ops.push(Operation::new("q", vec![]));
                ops.push(rectangle(clip, page_height));
                ops.push(Operation::new("W", vec![]));
                ops.push(Operation::new("n", vec![]));
                let inner = placement.then(Placement::fit(nested.size, *bounds));
                push_picture_ops(ops, nested, inner, page_height);
                ops.push(Operation::new("Q", vec![]));
            }
        }
    }
}

fn fill_color(color: &Color) -> Operation {
    let [r, g, b] = color.to_unit_rgb();
    Operation::new("rg", vec![r.into(), g.into(), b.into()])
}

fn rectangle(rect: Rect, page_height: f32) -> Operation {
    let bottom = flip_y(rect.y + rect.height, page_height);
    Operation::new(
        "re",
        vec![rect.x.into(), bottom.into(), rect.width.into(), rect.height.into()],
    )
}
