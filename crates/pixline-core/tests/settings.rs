use pixline_core::settings::{Settings, SettingsError};

#[test]
fn defaults_validate() {
    Settings::default().validate().unwrap();
}

#[test]
fn crop_disabled_skips_resize_checks() {
    let settings = Settings {
        crop_size: 0,
        resize_short_size: 0,
        ..Settings::default()
    };
    settings.validate().unwrap();
}

#[test]
fn rejects_inverted_scale_bounds() {
    let settings = Settings {
        lower_scale: 0.9,
        upper_scale: 0.1,
        ..Settings::default()
    };
    assert_eq!(
        settings.validate().unwrap_err(),
        SettingsError::InvalidScaleBounds {
            lower: 0.9,
            upper: 0.1
        }
    );
}

#[test]
fn rejects_nonpositive_ratio() {
    let settings = Settings {
        lower_ratio: 0.0,
        ..Settings::default()
    };
    assert!(matches!(
        settings.validate().unwrap_err(),
        SettingsError::InvalidRatioBounds { .. }
    ));
}

#[test]
fn rejects_crop_larger_than_resize_target() {
    let settings = Settings {
        crop_size: 300,
        resize_short_size: 256,
        ..Settings::default()
    };
    assert_eq!(
        settings.validate().unwrap_err(),
        SettingsError::CropExceedsResize {
            crop_size: 300,
            resize_short_size: 256
        }
    );
}

#[test]
fn rejects_zero_batch() {
    let settings = Settings {
        batch_size: 0,
        ..Settings::default()
    };
    assert_eq!(
        settings.validate().unwrap_err(),
        SettingsError::ZeroBatchSize
    );
}
