// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Mip-chain generation on a worker pool.
//!
//! Every level is an independent Lanczos3 rescale of the source image, so all
//! levels are computed in parallel. The caller blocks on a
//! [`CompletionGroup`] bounded by a timeout and a [`CancellationToken`].

use image::imageops::{self, FilterType};
use image::RgbaImage;
use prism_core::rhi::settings::RhiSettings;
use prism_core::sync::{CancellationToken, CompletionGroup, WaitError};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Why a mip chain could not be generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MipError {
    /// The source image has no pixels.
    EmptyImage,
    /// The worker pool could not be started.
    PoolCreation(String),
    /// The wait for the workers failed.
    Wait(WaitError),
    /// A worker finished without producing its level.
    LevelMissing(u32),
}

impl fmt::Display for MipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MipError::EmptyImage => write!(f, "Cannot generate mips of an empty image"),
            MipError::PoolCreation(msg) => write!(f, "Failed to start the mip worker pool: {msg}"),
            MipError::Wait(e) => write!(f, "Mip generation did not finish: {e}"),
            MipError::LevelMissing(level) => write!(f, "Mip level {level} was not produced"),
        }
    }
}

impl std::error::Error for MipError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MipError::Wait(e) => Some(e),
            _ => None,
        }
    }
}

impl From<WaitError> for MipError {
    fn from(e: WaitError) -> Self {
        MipError::Wait(e)
    }
}

/// A full mip chain. Level zero is the source image.
#[derive(Debug, Clone)]
pub struct MipChain {
    levels: Vec<RgbaImage>,
}

impl MipChain {
    /// Number of levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// `true` if the chain has no levels. Never the case for a generated chain.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Level `index`, largest first.
    pub fn level(&self, index: usize) -> Option<&RgbaImage> {
        self.levels.get(index)
    }

    /// Every level, largest first.
    pub fn levels(&self) -> &[RgbaImage] {
        &self.levels
    }

    /// Consumes the chain.
    pub fn into_levels(self) -> Vec<RgbaImage> {
        self.levels
    }
}

/// Number of levels from `width` x `height` down to the first level with a
/// dimension of one.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    let (mut width, mut height) = (width, height);
    let mut count = 1;
    while width > 1 && height > 1 {
        width /= 2;
        height /= 2;
        count += 1;
    }
    count
}

/// Generates mip chains on a dedicated rayon pool.
pub struct MipChainGenerator {
    pool: rayon::ThreadPool,
}

impl MipChainGenerator {
    /// Starts a pool of `threads` workers. Zero picks one per core.
    pub fn new(threads: usize) -> Result<Self, MipError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("prism-mip-{i}"))
            .build()
            .map_err(|e| MipError::PoolCreation(e.to_string()))?;
        log::debug!("Mip worker pool started with {} threads", pool.current_num_threads());
        Ok(Self { pool })
    }

    /// Generates every level of `source`, waiting at most `timeout`.
    ///
    /// Cancelling `cancel` makes queued levels skip their work and the wait
    /// return [`WaitError::Cancelled`].
    pub fn generate(
        &self,
        source: &RgbaImage,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<MipChain, MipError> {
        let (width, height) = source.dimensions();
        if width == 0 || height == 0 {
            return Err(MipError::EmptyImage);
        }

        let level_count = mip_level_count(width, height);
        let source = Arc::new(source.clone());
        let results: Arc<Mutex<Vec<Option<RgbaImage>>>> =
            Arc::new(Mutex::new(vec![None; level_count as usize]));

        let mut group = CompletionGroup::new();
        for level in 1..level_count {
            let token = group.token();
            let source = Arc::clone(&source);
            let results = Arc::clone(&results);
            let cancel = cancel.clone();
            let level_width = (width >> level).max(1);
            let level_height = (height >> level).max(1);
            self.pool.spawn(move || {
                if cancel.is_cancelled() {
                    return;
                }
                let image = imageops::resize(&*source, level_width, level_height, FilterType::Lanczos3);
                results.lock().unwrap_or_else(PoisonError::into_inner)[level as usize] = Some(image);
                token.complete();
            });
        }

        if let Err(e) = group.wait(timeout, cancel) {
            log::error!("Mip generation of a {width}x{height} image failed: {e}");
            return Err(e.into());
        }

        let mut results = std::mem::take(&mut *results.lock().unwrap_or_else(PoisonError::into_inner));
        let mut levels = Vec::with_capacity(level_count as usize);
        levels.push(source.as_ref().clone());
        for level in 1..level_count {
            let image = results[level as usize]
                .take()
                .ok_or(MipError::LevelMissing(level))?;
            levels.push(image);
        }
        log::debug!("Generated {level_count} mips for a {width}x{height} image");
        Ok(MipChain { levels })
    }

    /// [`generate`](Self::generate) bounded by `mip_generation_timeout_ms`.
    pub fn generate_with_settings(
        &self,
        source: &RgbaImage,
        settings: &RhiSettings,
        cancel: &CancellationToken,
    ) -> Result<MipChain, MipError> {
        self.generate(source, settings.mip_generation_timeout(), cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn level_count_stops_at_one_pixel() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(16, 16), 5);
        assert_eq!(mip_level_count(16, 2), 2);
    }

    #[test]
    fn generates_halving_levels() {
        let generator = MipChainGenerator::new(2).unwrap();
        let source = RgbaImage::from_pixel(32, 16, Rgba([200, 100, 50, 255]));

        let chain = generator
            .generate(&source, Duration::from_secs(10), &CancellationToken::new())
            .unwrap();

        let sizes: Vec<_> = chain.levels().iter().map(|l| l.dimensions()).collect();
        assert_eq!(sizes, vec![(32, 16), (16, 8), (8, 4), (4, 2), (2, 1)]);
        // A flat color stays flat under Lanczos3.
        let pixel = chain.level(4).unwrap().get_pixel(1, 0);
        assert!(pixel.0[0].abs_diff(200) <= 1);
    }

    #[test]
    fn cancelled_generation_fails() {
        let generator = MipChainGenerator::new(1).unwrap();
        let source = RgbaImage::new(64, 64);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = generator.generate(&source, Duration::from_secs(10), &cancel);

        assert_eq!(result.unwrap_err(), MipError::Wait(WaitError::Cancelled));
    }

    #[test]
    fn empty_image_is_rejected() {
        let generator = MipChainGenerator::new(1).unwrap();
        let result = generator.generate(
            &RgbaImage::new(0, 0),
            Duration::from_secs(1),
            &CancellationToken::new(),
        );
        assert_eq!(result.unwrap_err(), MipError::EmptyImage);
    }
}
