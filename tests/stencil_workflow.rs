use chrono::Local;
use landscape_stencil::settings::{load_from_path, save_to_path, StencilSettings, SETTINGS_FILE_NAME};
use landscape_stencil::stencil::export::{
    ensure_output_folder, export_layer_png, export_layer_tiles_png,
};
use landscape_stencil::stencil::{
    import_image_bytes, BrushKernel, BrushRadius, BrushStroke, CancelToken, ImportStage,
    LayerImport, MaskResolution, SourceChannel, Stencil, StencilError, MASK_MAX,
};
use std::io::Cursor;
use tempfile::tempdir;

fn png_bytes(side: u32, value: u8) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(side, side, image::Rgba([value, value, value, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
        .unwrap();
    bytes
}

fn small_settings() -> StencilSettings {
    StencilSettings {
        default_resolution: MaskResolution::R256,
        ..StencilSettings::default()
    }
}

fn stroke(kernel: BrushKernel) -> BrushStroke {
    BrushStroke::new((0.5, 0.5), BrushRadius::Fraction(0.25), kernel, 1.0)
}

#[test]
fn batch_import_stops_at_first_bad_entry() {
    let mut stencil = Stencil::new(small_settings());
    let entries = vec![
        LayerImport {
            name: "grass".into(),
            bytes: png_bytes(128, 255),
            channel: SourceChannel::Red,
        },
        LayerImport {
            name: "broken".into(),
            bytes: b"not a png".to_vec(),
            channel: SourceChannel::Red,
        },
        LayerImport {
            name: "never".into(),
            bytes: png_bytes(128, 0),
            channel: SourceChannel::Red,
        },
    ];

    let err = stencil.import_layers(&entries).unwrap_err();
    assert_eq!(err.index, 1);
    assert_eq!(err.name, "broken");
    assert_eq!(err.stage, ImportStage::Decode);
    assert!(matches!(err.source, StencilError::Decode(_)));
    assert!(err.to_string().contains("'broken'"));

    assert_eq!(stencil.len(), 1);
    let grass = &stencil.layers()[0];
    assert_eq!(grass.name, "grass");
    assert!(grass.mask().unwrap().cells().iter().all(|&c| c == MASK_MAX));
}

#[test]
fn paint_smooth_undo_flow_on_active_layer() {
    let mut stencil = Stencil::new(small_settings());
    let id = stencil.add_layer("cliffs");
    let cancel = CancelToken::new();

    stencil.paint_batch(&[stroke(BrushKernel::CircleSolid)]).unwrap();
    let painted = stencil.layer(id).unwrap().mask().unwrap().clone();

    stencil.smooth_layer_default(id, 1.0, &cancel).unwrap();
    let smoothed = stencil.layer(id).unwrap().mask().unwrap().clone();
    assert_ne!(smoothed, painted);

    let layer = stencil.layer_mut(id).unwrap();
    assert!(layer.undo().unwrap());
    assert_eq!(layer.mask().unwrap(), &painted);
    assert!(layer.undo().unwrap());
    assert!(layer.mask().unwrap().is_empty());
}

#[test]
fn cancelled_resize_leaves_layer_untouched() {
    let mut stencil = Stencil::new(small_settings());
    let id = stencil.add_layer("rivers");
    stencil.paint(&stroke(BrushKernel::CircleGradient)).unwrap();
    let before = stencil.layer(id).unwrap().mask().unwrap().clone();

    let cancel = CancelToken::new();
    cancel.cancel();
    assert_eq!(
        stencil.resize_layer(id, 512, &cancel),
        Err(StencilError::Cancelled)
    );
    let layer = stencil.layer(id).unwrap();
    assert_eq!(layer.resolution(), MaskResolution::R256);
    assert_eq!(layer.mask().unwrap(), &before);
}

#[test]
fn released_layers_keep_content_and_export() {
    let dir = tempdir().unwrap();
    let out = ensure_output_folder(Some(&dir.path().join("exports"))).unwrap();

    let mut stencil = Stencil::new(small_settings());
    let _active = stencil.add_layer("active");
    let hidden = stencil.add_layer("Hidden Roads");
    stencil.layer_mut(hidden).unwrap().visible = false;
    stencil
        .layer_mut(hidden)
        .unwrap()
        .paint(&stroke(BrushKernel::CircleSmooth))
        .unwrap();
    let before = stencil.layer(hidden).unwrap().mask().unwrap().clone();

    assert_eq!(stencil.free_unused_resources().unwrap(), 1);
    let layer = stencil.layer(hidden).unwrap();
    assert!(!layer.is_loaded());

    let path = export_layer_png(layer, &out, Local::now()).unwrap();
    assert!(path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .ends_with("_hidden-roads.png"));
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(import_image_bytes(&bytes, SourceChannel::Packed).unwrap(), before);

    let tiles = export_layer_tiles_png(layer, &out, 2, MaskResolution::R128, Local::now()).unwrap();
    assert_eq!(tiles.len(), 4);
    assert!(tiles.iter().all(|p| p.exists()));
    assert!(tiles[3].to_string_lossy().ends_with("_x1_y1.png"));
}

#[test]
fn settings_file_drives_new_layers() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(SETTINGS_FILE_NAME);
    let mut settings = small_settings();
    settings.default_resolution = MaskResolution::R512;
    settings.undo_limit = 1;
    save_to_path(&path, &settings).unwrap();

    let loaded = load_from_path(&path).unwrap().unwrap();
    let mut stencil = Stencil::new(loaded);
    let id = stencil.add_layer("mud");
    assert_eq!(stencil.layer(id).unwrap().resolution(), MaskResolution::R512);

    for _ in 0..3 {
        stencil.paint_batch(&[stroke(BrushKernel::CircleSolid)]).unwrap();
    }
    assert_eq!(stencil.layer(id).unwrap().history().undo_len(), 1);
}

#[test]
fn configured_export_folder_receives_layer_exports() {
    let dir = tempdir().unwrap();
    let folder = dir.path().join("configured").join("exports");
    let mut settings = small_settings();
    settings.export_folder = Some(folder.to_string_lossy().into_owned());

    let mut stencil = Stencil::new(settings);
    let id = stencil.add_layer("Lava Flow");
    stencil.paint(&stroke(BrushKernel::CircleSolid)).unwrap();

    assert_eq!(stencil.export_folder().unwrap(), folder);
    let path = stencil.export_layer(id, Local::now()).unwrap();
    assert_eq!(path.parent().unwrap(), folder.as_path());
    assert!(path.file_name().unwrap().to_string_lossy().ends_with("_lava-flow.png"));
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(
        &import_image_bytes(&bytes, SourceChannel::Packed).unwrap(),
        stencil.layer(id).unwrap().mask().unwrap()
    );

    let tiles = stencil
        .export_layer_tiles(id, 2, MaskResolution::R128, Local::now())
        .unwrap();
    assert_eq!(tiles.len(), 4);
    assert!(tiles.iter().all(|p| p.parent().unwrap() == folder.as_path()));
}

#[test]
fn exporting_unknown_layer_fails() {
    let dir = tempdir().unwrap();
    let mut settings = small_settings();
    settings.export_folder = Some(dir.path().to_string_lossy().into_owned());
    let stencil = Stencil::new(settings);
    let err = stencil
        .export_layer(landscape_stencil::stencil::LayerId::new(), Local::now())
        .unwrap_err();
    assert!(err.to_string().contains("unknown stencil layer"));
}
