use std::collections::BTreeMap;
use std::path::PathBuf;

use image::{Rgb, RgbImage};

use pixline_core::settings::Settings;
use pixline_reader::{ReaderCaps, TrainStream};
use pixline_vision::{IMAGENET_MEAN, IMAGENET_STD};

fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "pixline-{tag}-{}-{}",
        std::process::id(),
        pixline_observe::time::unix_time_ms()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Data root with `n` solid-color train images; image for label `i` has all
/// pixels at `20 * i`.
fn solid_train_root(tag: &str, n: usize) -> PathBuf {
    let dir = temp_dir(tag);
    let mut manifest = String::new();
    for i in 0..n {
        let name = format!("img{i}.png");
        let v = (20 * i) as u8;
        RgbImage::from_pixel(4, 4, Rgb([v, v, v]))
            .save(dir.join(&name))
            .unwrap();
        manifest.push_str(&format!("{name} {i}\n"));
    }
    std::fs::write(dir.join("train_list.txt"), manifest).unwrap();
    dir
}

fn mixup_settings(alpha: f64, batch_size: usize) -> Settings {
    Settings {
        crop_size: 0,
        use_mixup: true,
        mixup_alpha: alpha,
        batch_size,
        ..Settings::default()
    }
}

fn normalized(value: u8, c: usize) -> f32 {
    (value as f32 / 255.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c]
}

#[tokio::test(flavor = "multi_thread")]
async fn zero_alpha_passes_images_through_unmixed() {
    let dir = solid_train_root("mixup-alpha0", 8);
    let stream = pixline_reader::train(
        mixup_settings(0.0, 4),
        ReaderCaps::default(),
        &dir,
        7,
    )
    .unwrap();
    let TrainStream::Mixed(mut stream) = stream else {
        panic!("mixup settings must produce a mixed stream");
    };

    let mut label_a_counts: BTreeMap<i64, usize> = BTreeMap::new();
    let mut label_b_counts: BTreeMap<i64, usize> = BTreeMap::new();
    let mut items = 0usize;
    while let Some(item) = stream.recv().await {
        assert_eq!(item.lam, 1.0);
        // lam = 1 keeps the first image exactly; solid color pins it to the
        // label.
        let v = (20 * item.label_a) as u8;
        for c in 0..3 {
            assert_eq!(item.image.get(c, 1, 3), normalized(v, c));
        }
        *label_a_counts.entry(item.label_a).or_default() += 1;
        *label_b_counts.entry(item.label_b).or_default() += 1;
        items += 1;
    }
    stream.join().await.unwrap();

    assert_eq!(items, 8);
    // Every sample appears exactly once on each side: partners come from a
    // permutation of the batch.
    for i in 0..8 {
        assert_eq!(label_a_counts.get(&i).copied(), Some(1), "label_a {i}");
        assert_eq!(label_b_counts.get(&i).copied(), Some(1), "label_b {i}");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn partial_trailing_batch_is_dropped() {
    let dir = solid_train_root("mixup-tail", 10);
    let stream = pixline_reader::train(
        mixup_settings(0.2, 4),
        ReaderCaps::default(),
        &dir,
        3,
    )
    .unwrap();
    let TrainStream::Mixed(mut stream) = stream else {
        panic!("mixup settings must produce a mixed stream");
    };

    let mut items = 0usize;
    let mut lams = Vec::new();
    while let Some(item) = stream.recv().await {
        assert!((0.0..=1.0).contains(&item.lam), "lam {}", item.lam);
        lams.push(item.lam);
        items += 1;
    }
    stream.join().await.unwrap();

    // floor(10 / 4) full batches of 4; the trailing 2 never ship.
    assert_eq!(items, 8);
    // One coefficient per batch.
    assert!(lams[0..4].iter().all(|l| *l == lams[0]));
    assert!(lams[4..8].iter().all(|l| *l == lams[4]));
}

#[tokio::test(flavor = "multi_thread")]
async fn mixup_off_yields_plain_stream() {
    let dir = solid_train_root("mixup-off", 3);
    let settings = Settings {
        crop_size: 0,
        use_mixup: false,
        ..Settings::default()
    };
    let stream = pixline_reader::train(settings, ReaderCaps::default(), &dir, 1).unwrap();
    let TrainStream::Plain(mut stream) = stream else {
        panic!("mixup disabled must produce a plain stream");
    };

    let mut labels = Vec::new();
    while let Some(sample) = stream.recv().await {
        labels.push(sample.label.unwrap());
    }
    stream.join().await.unwrap();
    labels.sort_unstable();
    assert_eq!(labels, vec![0, 1, 2]);
}

#[tokio::test(flavor = "multi_thread")]
async fn same_pass_seed_reproduces_the_pass() {
    let dir = solid_train_root("mixup-seed", 8);

    let drain = |seed: u64| {
        let dir = dir.clone();
        async move {
            let stream = pixline_reader::train(
                mixup_settings(0.2, 4),
                ReaderCaps {
                    num_workers: 1,
                    queue_capacity: 16,
                },
                &dir,
                seed,
            )
            .unwrap();
            let TrainStream::Mixed(mut stream) = stream else {
                panic!("mixup settings must produce a mixed stream");
            };
            let mut out = Vec::new();
            while let Some(item) = stream.recv().await {
                out.push((item.label_a, item.label_b, item.lam));
            }
            stream.join().await.unwrap();
            out
        }
    };

    let a = drain(11).await;
    let b = drain(11).await;
    let c = drain(12).await;
    assert_eq!(a, b, "identical seeds must replay the pass");
    assert_ne!(a, c, "different seeds must reshuffle");
}
