//! Triangle rasterization and fixed-function blending.

use glam::{Vec2, Vec3, Vec4};

use crate::types::{BlendFactor, BlendMask, BlendMode, BlendOp, Rect};

/// A vertex after viewport mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct ScreenVertex {
    /// Pixel x, pixel y (row 0 first) and depth in `[0, 1]`.
    pub position: Vec3,
    pub color: Vec4,
    pub uv: Vec2,
}

/// Half-open pixel bounds `[x0, x1) x [y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct PixelBounds {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelBounds {
    /// Pixels whose centres lie inside `rect`, limited to a `width` x `height` target.
    pub fn covering(rect: &Rect, width: u32, height: u32) -> Self {
        let lo = |v: f32, max: u32| (v - 0.5).ceil().clamp(0.0, max as f32) as u32;
        Self {
            x0: lo(rect.x, width),
            y0: lo(rect.y, height),
            x1: lo(rect.right(), width),
            y1: lo(rect.bottom(), height),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }
}

/// A fragment produced by [`rasterize`].
#[derive(Debug, Clone, Copy)]
pub(super) struct Fragment {
    pub x: u32,
    pub y: u32,
    pub depth: f32,
    pub color: Vec4,
    pub uv: Vec2,
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Whether pixels exactly on the edge `a -> b` belong to this triangle.
///
/// With both triangles wound the same way a shared edge runs in opposite
/// directions, so exactly one of them owns it.
fn owns_edge(a: Vec2, b: Vec2) -> bool {
    let d = b - a;
    d.y > 0.0 || (d.y == 0.0 && d.x < 0.0)
}

/// Visit every pixel centre covered by the triangle inside `bounds`.
pub(super) fn rasterize(
    vertices: [ScreenVertex; 3],
    bounds: PixelBounds,
    mut emit: impl FnMut(Fragment),
) {
    let [mut v0, mut v1, mut v2] = vertices;
    let mut area = edge(v0.position.truncate(), v1.position.truncate(), v2.position.truncate());
    if area == 0.0 || !area.is_finite() {
        return;
    }
    if area < 0.0 {
        std::mem::swap(&mut v1, &mut v2);
        area = -area;
    }
    let (p0, p1, p2) = (
        v0.position.truncate(),
        v1.position.truncate(),
        v2.position.truncate(),
    );
    let owned = [owns_edge(p1, p2), owns_edge(p2, p0), owns_edge(p0, p1)];

    let min = p0.min(p1).min(p2);
    let max = p0.max(p1).max(p2);
    let x0 = ((min.x - 0.5).ceil().max(0.0) as u32).max(bounds.x0);
    let y0 = ((min.y - 0.5).ceil().max(0.0) as u32).max(bounds.y0);
    let x1 = ((max.x + 0.5).ceil().max(0.0) as u32).min(bounds.x1);
    let y1 = ((max.y + 0.5).ceil().max(0.0) as u32).min(bounds.y1);

    for y in y0..y1 {
        for x in x0..x1 {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let w = [edge(p1, p2, p), edge(p2, p0, p), edge(p0, p1, p)];
            let inside = w
                .iter()
                .zip(owned)
                .all(|(&w, owned)| w > 0.0 || (w == 0.0 && owned));
            if !inside {
                continue;
            }
            let l = Vec3::new(w[0], w[1], w[2]) / area;
            emit(Fragment {
                x,
                y,
                depth: l.x * v0.position.z + l.y * v1.position.z + l.z * v2.position.z,
                color: v0.color * l.x + v1.color * l.y + v2.color * l.z,
                uv: v0.uv * l.x + v1.uv * l.y + v2.uv * l.z,
            });
        }
    }
}

/// Per-channel factor, RGB in `xyz` and alpha in `w`.
fn factor(factor: BlendFactor, src: Vec4, dst: Vec4, constant: Vec4) -> Vec4 {
    match factor {
        BlendFactor::Zero => Vec4::ZERO,
        BlendFactor::One => Vec4::ONE,
        BlendFactor::SrcColor | BlendFactor::Src1Color => src,
        BlendFactor::OneMinusSrcColor | BlendFactor::OneMinusSrc1Color => Vec4::ONE - src,
        BlendFactor::DstColor => dst,
        BlendFactor::OneMinusDstColor => Vec4::ONE - dst,
        BlendFactor::SrcAlpha | BlendFactor::Src1Alpha => Vec4::splat(src.w),
        BlendFactor::OneMinusSrcAlpha | BlendFactor::OneMinusSrc1Alpha => {
            Vec4::splat(1.0 - src.w)
        }
        BlendFactor::DstAlpha => Vec4::splat(dst.w),
        BlendFactor::OneMinusDstAlpha => Vec4::splat(1.0 - dst.w),
        BlendFactor::ConstantColor => constant,
        BlendFactor::OneMinusConstantColor => Vec4::ONE - constant,
        BlendFactor::ConstantAlpha => Vec4::splat(constant.w),
        BlendFactor::OneMinusConstantAlpha => Vec4::splat(1.0 - constant.w),
        BlendFactor::SrcAlphaSaturate => {
            let f = src.w.min(1.0 - dst.w);
            Vec4::new(f, f, f, 1.0)
        }
    }
}

fn combine(op: BlendOp, src: Vec4, dst: Vec4, src_factor: Vec4, dst_factor: Vec4) -> Vec4 {
    match op {
        BlendOp::Add => src * src_factor + dst * dst_factor,
        BlendOp::Subtract => src * src_factor - dst * dst_factor,
        BlendOp::ReverseSubtract => dst * dst_factor - src * src_factor,
        BlendOp::Min => src.min(dst),
        BlendOp::Max => src.max(dst),
    }
}

/// Blend `src` over `dst` and apply the channel write mask.
pub(super) fn blend(mode: &BlendMode, src: Vec4, dst: Vec4, constant: Vec4) -> Vec4 {
    let color = combine(
        mode.color_op,
        src,
        dst,
        factor(mode.color_src, src, dst, constant),
        factor(mode.color_dst, src, dst, constant),
    );
    let alpha = combine(
        mode.alpha_op,
        src,
        dst,
        factor(mode.alpha_src, src, dst, constant),
        factor(mode.alpha_dst, src, dst, constant),
    );
    let blended = color.truncate().extend(alpha.w);

    let keep = |flag: BlendMask, new: f32, old: f32| {
        if mode.mask.contains(flag) {
            new
        } else {
            old
        }
    };
    Vec4::new(
        keep(BlendMask::RED, blended.x, dst.x),
        keep(BlendMask::GREEN, blended.y, dst.y),
        keep(BlendMask::BLUE, blended.z, dst.z),
        keep(BlendMask::ALPHA, blended.w, dst.w),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn vertex(x: f32, y: f32) -> ScreenVertex {
        ScreenVertex {
            position: Vec3::new(x, y, 0.5),
            color: Vec4::ONE,
            uv: Vec2::ZERO,
        }
    }

    fn covered(vertices: [ScreenVertex; 3], size: u32) -> Vec<(u32, u32)> {
        let bounds = PixelBounds::covering(&Rect::from_dimensions(size, size), size, size);
        let mut pixels = Vec::new();
        rasterize(vertices, bounds, |f| pixels.push((f.x, f.y)));
        pixels.sort();
        pixels
    }

    #[test]
    fn test_shared_edge_is_drawn_once() {
        // Two triangles forming a 4x4 quad split along the diagonal.
        let a = covered([vertex(0.0, 0.0), vertex(4.0, 0.0), vertex(4.0, 4.0)], 4);
        let b = covered([vertex(0.0, 0.0), vertex(4.0, 4.0), vertex(0.0, 4.0)], 4);
        let mut all: Vec<_> = a.iter().chain(b.iter()).copied().collect();
        all.sort();
        let before = all.len();
        all.dedup();
        assert_eq!(before, all.len());
        assert_eq!(all.len(), 16);
    }

    #[test]
    fn test_winding_does_not_matter() {
        let cw = covered([vertex(0.0, 0.0), vertex(4.0, 0.0), vertex(0.0, 4.0)], 4);
        let ccw = covered([vertex(0.0, 0.0), vertex(0.0, 4.0), vertex(4.0, 0.0)], 4);
        assert_eq!(cw, ccw);
        assert!(!cw.is_empty());
    }

    #[test]
    fn test_bounds_clip() {
        let bounds = PixelBounds::covering(&Rect::new(1.0, 1.0, 2.0, 2.0), 4, 4);
        assert_eq!(bounds, PixelBounds { x0: 1, y0: 1, x1: 3, y1: 3 });
        let mut pixels = Vec::new();
        rasterize(
            [vertex(-4.0, -4.0), vertex(12.0, -4.0), vertex(-4.0, 12.0)],
            bounds,
            |f| pixels.push((f.x, f.y)),
        );
        pixels.sort();
        assert_eq!(pixels, vec![(1, 1), (1, 2), (2, 1), (2, 2)]);
    }

    #[test]
    fn test_degenerate_triangle_emits_nothing() {
        assert!(covered([vertex(0.0, 0.0), vertex(2.0, 2.0), vertex(4.0, 4.0)], 4).is_empty());
    }

    #[rstest]
    #[case(BlendMode::NORMAL, Vec4::new(0.5, 0.0, 0.0, 0.5), Vec4::new(0.0, 0.0, 1.0, 1.0), Vec4::new(0.5, 0.0, 0.5, 1.0))]
    #[case(BlendMode::SUBTRACT, Vec4::new(0.25, 0.25, 0.25, 0.25), Vec4::ONE, Vec4::new(0.75, 0.75, 0.75, 0.75))]
    #[case(BlendMode::new(BlendOp::Min, BlendFactor::Zero, BlendFactor::Zero), Vec4::new(0.2, 0.8, 0.2, 1.0), Vec4::splat(0.5), Vec4::new(0.2, 0.5, 0.2, 0.5))]
    fn test_blend_equations(
        #[case] mode: BlendMode,
        #[case] src: Vec4,
        #[case] dst: Vec4,
        #[case] expected: Vec4,
    ) {
        let result = blend(&mode, src, dst, Vec4::ONE);
        assert!(result.abs_diff_eq(expected, 1e-6), "{result:?} != {expected:?}");
    }

    #[test]
    fn test_mask_keeps_destination() {
        let mode = BlendMode::NORMAL.with_mask(BlendMask::RED | BlendMask::ALPHA);
        let result = blend(&mode, Vec4::ONE, Vec4::new(0.0, 0.25, 0.5, 0.0), Vec4::ONE);
        assert_eq!(result, Vec4::new(1.0, 0.25, 0.5, 1.0));
    }

    #[test]
    fn test_constant_color_factor() {
        let mode = BlendMode::new(BlendOp::Add, BlendFactor::ConstantColor, BlendFactor::Zero);
        let constant = Vec4::new(0.5, 0.25, 1.0, 1.0);
        let result = blend(&mode, Vec4::ONE, Vec4::ZERO, constant);
        assert_eq!(result, constant);
    }
}
