use anyhow::{bail, Context, Result};

use inkstage_engine::coords::{Rect, Viewport};
use inkstage_engine::device::{Gpu, GpuInit};
use inkstage_engine::logging::{init_logging, LoggingConfig};
use inkstage_engine::render::{RenderBackend, RenderCtx, RenderTarget, SkinRenderer};
use inkstage_engine::skin::{EffectMask, PenAttributes, Scale, Skin, SkinConfig, SkinStore};

const STAGE: [u32; 2] = [480, 360];

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        bail!("usage: inkstage-studio <svg-path> [scale%...]");
    };
    let mut scales = args
        .map(|arg| arg.parse::<f32>().with_context(|| format!("bad scale {arg:?}")))
        .collect::<Result<Vec<_>>>()?;
    if scales.is_empty() {
        scales = vec![25.0, 100.0, 300.0];
    }

    let markup = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;

    let gpu = Gpu::new_headless_blocking(GpuInit::default())?;
    let info = gpu.adapter_info();
    log::info!("adapter: {} ({:?})", info.name, info.backend);

    let mut backend = gpu.backend();
    let config = SkinConfig {
        max_texture_dimension: backend.max_texture_dimension().min(SkinConfig::default().max_texture_dimension),
    };
    let mut store = SkinStore::new(STAGE, config);

    // ── vector skin ───────────────────────────────────────────────────────

    let costume = store.create_raster_skin();
    let raster = store.raster_mut(costume)?;
    raster.set_content(&mut backend, &markup)?;
    if let Some([w, h]) = raster.take_ready() {
        log::info!("{costume}: loaded {path}, natural size {w}x{h}");
    }
    raster.set_visible(true);

    for &percent in &scales {
        let texture = store.get_texture(&mut backend, costume, Some(Scale::uniform(percent)));
        let (w, h) = backend.texture_size(texture).unwrap_or((0, 0));
        log::info!("{costume}: {percent}% -> {texture} ({w}x{h})");
    }

    // ── pen layer ─────────────────────────────────────────────────────────

    let pen = store.create_stroke_skin(&mut backend)?;
    let stroke = store.stroke_mut(pen)?;
    let red = PenAttributes::new(4.0, [1.0, 0.0, 0.0, 1.0]);
    stroke.draw_line(&mut backend, &red, 40.0, 40.0, 440.0, 320.0)?;
    stroke.draw_point(&mut backend, &PenAttributes::default(), 240.0, 60.0)?;
    let touching = stroke.is_touching(&mut backend, 0.5, 0.5)?;
    log::info!("{pen}: stage center touches ink: {touching}");

    // ── composite ─────────────────────────────────────────────────────────

    let [w, h] = store.raster_mut(costume)?.size();
    let center = Rect::new(0.0, 0.0, STAGE[0] as f32, STAGE[1] as f32).center();
    let draws = [
        store.draw(
            &mut backend,
            costume,
            Rect::new(center.x - w * 0.5, center.y - h * 0.5, w, h),
            Scale::NATIVE,
            EffectMask::NONE,
            0.0,
        ),
        store.draw(
            &mut backend,
            pen,
            Rect::new(0.0, 0.0, STAGE[0] as f32, STAGE[1] as f32),
            Scale::NATIVE,
            EffectMask::NONE,
            0.0,
        ),
    ];

    let frame = backend.create_render_target(STAGE[0], STAGE[1])?;
    {
        let ctx = RenderCtx::for_backend(&backend, Viewport::from_texels(STAGE));
        let mut encoder = backend
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("studio frame") });
        let mut target = RenderTarget::new(&mut encoder, backend.view(frame));
        SkinRenderer::new().render(&ctx, &mut target, &backend, &draws);
        backend.queue().submit(Some(encoder.finish()));
    }

    let pixels = backend.read_target(frame)?;
    let covered = pixels.chunks_exact(4).filter(|px| px[3] > 0).count();
    log::info!(
        "frame: {covered} of {} pixels covered",
        STAGE[0] as usize * STAGE[1] as usize
    );

    backend.release_texture(frame);
    store.clear(&mut backend);
    Ok(())
}
