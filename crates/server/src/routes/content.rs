//! Static home page content.

use crate::extract::Json;
use crate::services::content::{self, HeroSlide, PromoBlock};

pub async fn hero() -> Json<Vec<HeroSlide>> {
    Json(content::hero_slides())
}

pub async fn promo() -> Json<Vec<PromoBlock>> {
    Json(content::promo_blocks())
}
