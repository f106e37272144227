//! Integration tests rendering thumbnails into the cache.

use inkbook_core::{Appearance, DrawingBlob, Ink, InkPoint, RenderContext, Stroke};
use inkbook_render::{DrawingRenderer, InkRenderer, ThumbnailCache, ThumbnailGeometry};

fn diagonal() -> DrawingBlob {
    Ink::new(vec![Stroke::new(vec![
        InkPoint::new(0.0, 0.0),
        InkPoint::new(768.0, 1024.0),
    ])
    .with_width(8.0)])
    .to_blob()
}

#[test]
fn test_thumbnail_renders_at_geometry_size_into_cache() {
    let geometry = ThumbnailGeometry::default();
    let ctx = RenderContext::new(Appearance::Light, 1.0);
    let mut cache = ThumbnailCache::new(ctx);
    let ticket = cache.push_placeholder();

    let image = InkRenderer::new()
        .render(
            &diagonal(),
            geometry.content_bounds(),
            geometry.scale(&ctx),
            ctx.appearance,
        )
        .expect("render");
    assert_eq!((image.width, image.height), geometry.pixel_size(&ctx));

    assert_eq!(cache.apply(ticket.index, ticket.generation, image), Some(0));
    let thumb = cache.get(0).expect("cached");
    // Diagonal passes through the centre of the thumbnail.
    let centre = thumb.pixel(96, 128).expect("centre");
    assert!(centre[0] < 128, "expected ink at centre, got {centre:?}");
}
