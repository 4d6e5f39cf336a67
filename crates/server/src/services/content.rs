//! Static marketing blocks for the storefront home page.

use serde::Serialize;

const CDN: &str = "https://storage.yandexcloud.net/droneshop";

/// Home page carousel slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeroSlide {
    pub id: &'static str,
    pub image: String,
    pub title: &'static str,
    pub subtitle: &'static str,
    pub cta: &'static str,
    pub link: &'static str,
}

/// Promotional tile below the carousel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromoBlock {
    pub id: &'static str,
    pub image: String,
    pub title: &'static str,
    pub description: &'static str,
    pub cta: &'static str,
    pub link: &'static str,
}

#[must_use]
pub fn hero_slides() -> Vec<HeroSlide> {
    vec![
        HeroSlide {
            id: "fpv-experience",
            image: format!("{CDN}/hero-night-flight.jpg"),
            title: "FPV flight without limits",
            subtitle: "Top kits for freestyle, racing and professional filming",
            cta: "Build a kit",
            link: "/catalog?segment=fpv",
        },
        HeroSlide {
            id: "cine-drones",
            image: format!("{CDN}/hero-cinema-pro.jpg"),
            title: "Cinematic footage",
            subtitle: "Ready-to-fly cinewhoops and accessories for creators",
            cta: "Cinewhoop catalog",
            link: "/catalog?segment=cinema",
        },
        HeroSlide {
            id: "micro-fleet",
            image: format!("{CDN}/hero-micro-sunrise.jpg"),
            title: "Micro drones for indoors",
            subtitle: "Quiet, safe quadcopters for training and filming",
            cta: "Choose a micro",
            link: "/catalog?segment=micro",
        },
    ]
}

#[must_use]
pub fn promo_blocks() -> Vec<PromoBlock> {
    vec![
        PromoBlock {
            id: "academy",
            image: format!("{CDN}/promo-academy.jpg"),
            title: "Pilot academy",
            description: "Hands-on courses and simulator training with a mentor",
            cta: "Sign up",
            link: "/services/training",
        },
        PromoBlock {
            id: "service",
            image: format!("{CDN}/promo-service.jpg"),
            title: "Service and customization",
            description: "Repair, upgrades and tuning for your flying style",
            cta: "Leave a request",
            link: "/services/service-center",
        },
    ]
}
