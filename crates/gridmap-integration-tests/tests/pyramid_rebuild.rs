//! Integration test: full pyramid rebuild from zoom-0 data.
//!
//! Sparse leaves at (0,0) and (5,5) produce ancestors with transparent
//! gaps; the top level equals five parent steps from either leaf, and a
//! second rebuild yields identical bytes.

use gridmap_engine::{BatchRequest, EngineConfig, MapEngine};
use gridmap_types::Coord;
use image::{Rgba, RgbaImage};

fn png(px: [u8; 4]) -> Vec<u8> {
    gridmap_pyramid::encode_png(&RgbaImage::from_pixel(100, 100, Rgba(px))).expect("encode")
}

/// Register a 6×6 viewport anchored at its top-left cell, so local
/// positions equal map coordinates.
fn register_grid(engine: &MapEngine) {
    let grids = (0..6)
        .map(|x| (0..6).map(|y| format!("g{x}{y}")).collect())
        .collect();
    let resp = engine
        .register_batch(&BatchRequest {
            grids,
            anchor: Some([0, 0]),
        })
        .expect("register");
    assert_eq!(resp.coords, Coord::ORIGIN);
}

#[test]
fn sparse_rebuild_leaves_transparent_gaps() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = MapEngine::open(dir.path(), EngineConfig::default()).expect("open");
    register_grid(&engine);
    engine.upload_grid("g00", &png([255, 255, 0, 255])).expect("upload");
    engine.upload_grid("g55", &png([0, 255, 255, 255])).expect("upload");

    let written = engine.rebuild_all().expect("rebuild");
    assert_eq!(written, 7);

    let mut top = Coord::new(5, 5);
    for _ in 0..5 {
        top = top.parent();
    }
    assert_eq!(top, Coord::ORIGIN);
    assert!(engine.get_tile(1, top, 5).expect("get").is_some());

    // (1,1) at zoom 1 has no children at all
    assert!(engine.get_tile(1, Coord::new(1, 1), 1).expect("get").is_none());

    let mid = engine
        .get_tile(1, Coord::new(1, 1), 2)
        .expect("get")
        .expect("zoom 2 tile over (4..8, 4..8)");
    let img = gridmap_pyramid::decode(&engine.layout().read(&mid.file).expect("read"))
        .expect("decode");
    assert_eq!(img.get_pixel(5, 5).0[3], 0);
    assert!(img.get_pixel(30, 30).0[3] > 0);
}

#[test]
fn repeated_full_rebuild_is_stable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = MapEngine::open(dir.path(), EngineConfig::default()).expect("open");
    register_grid(&engine);
    for (id, px) in [("g00", [9, 9, 9, 255]), ("g10", [90, 9, 9, 255]), ("g11", [9, 90, 9, 255])] {
        engine.upload_grid(id, &png(px)).expect("upload");
    }

    engine.rebuild_all().expect("first");
    let first: Vec<Vec<u8>> = (1..=5)
        .map(|z| {
            let t = engine.get_tile(1, Coord::ORIGIN, z).expect("get").expect("tile");
            engine.layout().read(&t.file).expect("read")
        })
        .collect();
    engine.rebuild_all().expect("second");
    for (z, bytes) in (1..=5).zip(first) {
        let t = engine.get_tile(1, Coord::ORIGIN, z).expect("get").expect("tile");
        assert_eq!(engine.layout().read(&t.file).expect("read"), bytes, "zoom {z}");
    }
}

#[test]
fn wiped_leaf_clears_ancestors() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = MapEngine::open(dir.path(), EngineConfig::default()).expect("open");
    register_grid(&engine);
    engine.upload_grid("g00", &png([200, 0, 0, 255])).expect("upload");

    engine.wipe_tile(1, Coord::ORIGIN).expect("wipe");
    for z in 1..=5 {
        let t = engine.get_tile(1, Coord::ORIGIN, z).expect("get").expect("tile");
        let img = gridmap_pyramid::decode(&engine.layout().read(&t.file).expect("read"))
            .expect("decode");
        assert!(img.pixels().all(|p| p.0[3] == 0), "zoom {z} not cleared");
    }
}
