use std::sync::Arc;

use showroom_blob::{HeroResolver, ImageAdapter};

use crate::multipart::MultipartConfig;

#[derive(Clone)]
pub struct ShowroomState {
    pub images: Arc<ImageAdapter>,
    pub hero: Arc<HeroResolver>,
    pub multipart: MultipartConfig,
}

impl ShowroomState {
    pub fn new(images: ImageAdapter, hero: HeroResolver) -> Self {
        let multipart = MultipartConfig::for_images(images.config());
        Self {
            images: Arc::new(images),
            hero: Arc::new(hero),
            multipart,
        }
    }

    pub fn with_multipart(mut self, multipart: MultipartConfig) -> Self {
        self.multipart = multipart;
        self
    }
}
