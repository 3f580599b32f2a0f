//! Static catalogs of selectable backgrounds, overlays, and device frames.
//!
//! Pure data: picker UIs only ever select identifiers out of these tables,
//! and the pipeline looks entries up by id. Nothing here is mutated at
//! runtime; the overlay resolver copies stops out of the templates.

/// Preset solid background colors (hex). The first entry is the session
/// default background.
pub static PRESET_COLORS: [&str; 15] = [
    "#FF5733", "#FFC300", "#FF3399", "#9B59B6", "#2ECC71", "#C70039", "#3498DB", "#FF9999",
    "#66B2FF", "#8E44AD", "#239B56", "#FF6B6B", "#4ECDC4", "#45B7D1", "#E74C3C",
];

/// Preset wallpaper image URLs (thumbnail-sized crops).
pub static PRESET_WALLPAPERS: [&str; 5] = [
    "https://images.unsplash.com/photo-1557683316-973673baf926?auto=format&fit=crop&w=300&q=80",
    "https://images.unsplash.com/photo-1579546929518-9e396f3cc809?auto=format&fit=crop&w=300&q=80",
    "https://images.unsplash.com/photo-1557682250-33bd709cbe85?auto=format&fit=crop&w=300&q=80",
    "https://images.unsplash.com/photo-1557682224-5b8590cd9ec5?auto=format&fit=crop&w=300&q=80",
    "https://images.unsplash.com/photo-1557682260-96773eb01377?auto=format&fit=crop&w=300&q=80",
];

/// One color stop of a gradient template.
///
/// The template alpha of an [`StopColor::Rgba`] stop is a placeholder the
/// overlay resolver replaces with the user opacity; [`StopColor::Transparent`]
/// keyword stops carry no alpha channel and are never rewritten.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct TemplateStop {
    /// Stop position along the gradient line, percent in `[0, 100]`.
    pub offset_pct: f64,
    pub color: StopColor,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub enum StopColor {
    /// Alpha-bearing stop; `a` is in `[0, 1]`.
    Rgba { r: u8, g: u8, b: u8, a: f64 },
    /// The CSS `transparent` keyword.
    Transparent,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub enum GradientKind {
    /// CSS angle convention: 0 points up, degrees increase clockwise.
    Linear { angle_deg: f64 },
    Radial { center: RadialCenter },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum RadialCenter {
    Center,
    TopRight,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct GradientTemplate {
    pub kind: GradientKind,
    pub stops: &'static [TemplateStop],
}

/// Catalog entry for one overlay style.
#[derive(Clone, Copy, Debug, serde::Serialize)]
pub struct OverlayDefinition {
    pub id: &'static str,
    pub label: &'static str,
    /// `None` renders nothing (the `none` entry).
    pub gradient: Option<GradientTemplate>,
}

const BLACK: StopColor = StopColor::Rgba {
    r: 0,
    g: 0,
    b: 0,
    a: 1.0,
};

const fn stop(offset_pct: f64, color: StopColor) -> TemplateStop {
    TemplateStop { offset_pct, color }
}

pub static OVERLAYS: [OverlayDefinition; 8] = [
    OverlayDefinition {
        id: "none",
        label: "None",
        gradient: None,
    },
    OverlayDefinition {
        id: "overlay1",
        label: "Diagonal Fade",
        gradient: Some(GradientTemplate {
            kind: GradientKind::Linear { angle_deg: 45.0 },
            stops: &[stop(0.0, BLACK), stop(100.0, StopColor::Transparent)],
        }),
    },
    OverlayDefinition {
        id: "overlay2",
        label: "Bottom Fade",
        gradient: Some(GradientTemplate {
            kind: GradientKind::Linear { angle_deg: 180.0 },
            stops: &[stop(0.0, StopColor::Transparent), stop(100.0, BLACK)],
        }),
    },
    OverlayDefinition {
        id: "overlay3",
        label: "Side Fade",
        gradient: Some(GradientTemplate {
            kind: GradientKind::Linear { angle_deg: 90.0 },
            stops: &[stop(0.0, BLACK), stop(100.0, StopColor::Transparent)],
        }),
    },
    OverlayDefinition {
        id: "overlay4",
        label: "Radial",
        gradient: Some(GradientTemplate {
            kind: GradientKind::Radial {
                center: RadialCenter::Center,
            },
            stops: &[stop(0.0, StopColor::Transparent), stop(100.0, BLACK)],
        }),
    },
    OverlayDefinition {
        id: "overlay5",
        label: "Cross Fade",
        gradient: Some(GradientTemplate {
            kind: GradientKind::Linear { angle_deg: 135.0 },
            stops: &[
                stop(0.0, BLACK),
                stop(50.0, StopColor::Transparent),
                stop(100.0, BLACK),
            ],
        }),
    },
    OverlayDefinition {
        id: "overlay6",
        label: "Double Fade",
        gradient: Some(GradientTemplate {
            kind: GradientKind::Linear { angle_deg: 180.0 },
            stops: &[
                stop(0.0, BLACK),
                stop(50.0, StopColor::Transparent),
                stop(100.0, BLACK),
            ],
        }),
    },
    OverlayDefinition {
        id: "overlay7",
        label: "Corner Fade",
        gradient: Some(GradientTemplate {
            kind: GradientKind::Radial {
                center: RadialCenter::TopRight,
            },
            stops: &[stop(0.0, StopColor::Transparent), stop(100.0, BLACK)],
        }),
    },
];

pub fn overlay_by_id(id: &str) -> Option<&'static OverlayDefinition> {
    OVERLAYS.iter().find(|o| o.id == id)
}

/// Fractional placement of screen content inside a device frame image.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct ContentBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Catalog entry for one device frame.
#[derive(Clone, Copy, Debug, serde::Serialize)]
pub struct DeviceFrame {
    pub id: &'static str,
    pub label: &'static str,
    pub frame_url: Option<&'static str>,
    pub content_box: Option<ContentBox>,
}

pub static DEVICE_FRAMES: [DeviceFrame; 4] = [
    DeviceFrame {
        id: "none",
        label: "None",
        frame_url: None,
        content_box: None,
    },
    DeviceFrame {
        id: "iphone",
        label: "iPhone",
        frame_url: Some(
            "https://raw.githubusercontent.com/pixsellz/device-frames/main/assets/iphone-14-pro.png",
        ),
        content_box: Some(ContentBox {
            left: 0.0575,
            top: 0.02,
            width: 0.885,
            height: 0.96,
        }),
    },
    DeviceFrame {
        id: "macbook",
        label: "MacBook",
        frame_url: Some(
            "https://raw.githubusercontent.com/pixsellz/device-frames/main/assets/macbook-pro.png",
        ),
        content_box: Some(ContentBox {
            left: 0.1225,
            top: 0.06,
            width: 0.755,
            height: 0.76,
        }),
    },
    DeviceFrame {
        id: "laptop",
        label: "Windows Laptop",
        frame_url: Some(
            "https://raw.githubusercontent.com/pixsellz/device-frames/main/assets/surface-laptop.png",
        ),
        content_box: Some(ContentBox {
            left: 0.1425,
            top: 0.07,
            width: 0.715,
            height: 0.72,
        }),
    },
];

pub fn device_by_id(id: &str) -> Option<&'static DeviceFrame> {
    DEVICE_FRAMES.iter().find(|d| d.id == id)
}
