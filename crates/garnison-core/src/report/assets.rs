//! Remote images embedded in reports.
//!
//! Every image is fetched at most once per report and decoded to raw RGB
//! before layout starts. A failed fetch or decode is logged and the image is
//! left out; it never fails the report.

use std::collections::HashMap;

use anyhow::Result;
use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

/// Maximum concurrent image downloads
const MAX_CONCURRENT_FETCHES: usize = 4;

/// Source of raw image bytes, keyed by URL
#[allow(async_fn_in_trait)]
pub trait AssetFetcher {
    async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>>;
}

/// Decoded 8-bit RGB image
#[derive(Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl std::fmt::Debug for ImageAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageAsset")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgb.len())
            .finish()
    }
}

impl ImageAsset {
    /// Decode PNG or JPEG bytes. Transparent pixels are flattened onto white.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();

        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        for pixel in rgba.pixels() {
            let [r, g, b, a] = pixel.0;
            let alpha = a as u32;
            for channel in [r, g, b] {
                let blended = (channel as u32 * alpha + 255 * (255 - alpha)) / 255;
                rgb.push(blended as u8);
            }
        }

        Ok(Self { width, height, rgb })
    }

    /// Largest (w, h) with this image's aspect ratio fitting the box
    pub fn fit(&self, max_w: f32, max_h: f32) -> (f32, f32) {
        if self.width == 0 || self.height == 0 {
            return (max_w, max_h);
        }
        let scale = (max_w / self.width as f32).min(max_h / self.height as f32);
        (self.width as f32 * scale, self.height as f32 * scale)
    }
}

/// URLs a report wants embedded
#[derive(Debug, Clone, Default)]
pub struct AssetPlan {
    pub logo_url: Option<String>,
    pub border_url: Option<String>,
    pub photo_urls: Vec<String>,
}

/// Images that were fetched and decoded successfully
#[derive(Debug, Clone, Default)]
pub struct ReportAssets {
    pub logo: Option<ImageAsset>,
    pub border: Option<ImageAsset>,
    pub photos: HashMap<String, ImageAsset>,
}

impl ReportAssets {
    pub fn photo(&self, url: &str) -> Option<&ImageAsset> {
        self.photos.get(url)
    }
}

async fn fetch_one<F: AssetFetcher>(fetcher: &F, url: &str) -> Option<ImageAsset> {
    let bytes = match fetcher.fetch_asset(url).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(url = %url, error = %e, "Image fetch failed, omitting it");
            return None;
        }
    };
    match ImageAsset::decode(&bytes) {
        Ok(image) => {
            debug!(url = %url, width = image.width, height = image.height, "Image decoded");
            Some(image)
        }
        Err(e) => {
            warn!(url = %url, error = %e, "Image decode failed, omitting it");
            None
        }
    }
}

/// Fetch every distinct URL in the plan once.
pub async fn load_assets<F: AssetFetcher>(fetcher: &F, plan: &AssetPlan) -> ReportAssets {
    let mut urls: Vec<&str> = Vec::new();
    let wanted = plan
        .logo_url
        .iter()
        .chain(plan.border_url.iter())
        .chain(plan.photo_urls.iter());
    for url in wanted {
        let url = url.trim();
        if !url.is_empty() && !urls.contains(&url) {
            urls.push(url);
        }
    }

    let fetched: HashMap<&str, ImageAsset> = stream::iter(urls)
        .map(|url| async move { (url, fetch_one(fetcher, url).await) })
        .buffer_unordered(MAX_CONCURRENT_FETCHES)
        .filter_map(|(url, image)| async move { image.map(|i| (url, i)) })
        .collect()
        .await;

    let lookup = |url: &Option<String>| {
        url.as_deref()
            .and_then(|u| fetched.get(u.trim()))
            .cloned()
    };

    ReportAssets {
        logo: lookup(&plan.logo_url),
        border: lookup(&plan.border_url),
        photos: plan
            .photo_urls
            .iter()
            .filter_map(|u| fetched.get(u.trim()).map(|i| (u.clone(), i.clone())))
            .collect(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Mutex;

    /// 2x1 PNG: one opaque red pixel, one fully transparent pixel
    pub(crate) fn sample_png() -> Vec<u8> {
        let mut img = image::RgbaImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, image::Rgba([0, 0, 0, 0]));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    /// Serves `sample_png` for known URLs and records every request
    pub(crate) struct FakeFetcher {
        pub known: Vec<String>,
        pub requests: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        pub(crate) fn new(known: &[&str]) -> Self {
            Self {
                known: known.iter().map(|s| s.to_string()).collect(),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl AssetFetcher for FakeFetcher {
        async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>> {
            self.requests.lock().unwrap().push(url.to_string());
            if self.known.iter().any(|k| k == url) {
                Ok(sample_png())
            } else {
                anyhow::bail!("404 Not Found")
            }
        }
    }

    #[test]
    fn test_decode_flattens_alpha_on_white() {
        let image = ImageAsset::decode(&sample_png()).unwrap();
        assert_eq!((image.width, image.height), (2, 1));
        assert_eq!(image.rgb, vec![255, 0, 0, 255, 255, 255]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(ImageAsset::decode(b"not an image").is_err());
    }

    #[test]
    fn test_fit_keeps_aspect_ratio() {
        let image = ImageAsset { width: 200, height: 100, rgb: Vec::new() };
        assert_eq!(image.fit(100.0, 100.0), (100.0, 50.0));
    }

    #[tokio::test]
    async fn test_load_assets_fetches_each_url_once() {
        let fetcher = FakeFetcher::new(&["/logo.png", "/p1.png"]);
        let plan = AssetPlan {
            logo_url: Some("/logo.png".into()),
            border_url: None,
            photo_urls: vec!["/p1.png".into(), "/p1.png".into(), "/missing.png".into()],
        };
        let assets = load_assets(&fetcher, &plan).await;

        assert!(assets.logo.is_some());
        assert!(assets.border.is_none());
        assert!(assets.photo("/p1.png").is_some());
        assert!(assets.photo("/missing.png").is_none());

        let mut requests = fetcher.requests.lock().unwrap().clone();
        requests.sort();
        assert_eq!(requests, vec!["/logo.png", "/missing.png", "/p1.png"]);
    }
}
