//! Built-in designs, fixed at process start.

use super::{
    CanvasTemplate, CaptureFormat, CaptureOptions, ClipRect, Decoration, FieldLayout,
    HtmlTemplate, PhotoFrame, PlaceholderBinding, PlaceholderKind, SvgTemplate, TemplateConfig,
    TemplateSpec, TextAlign,
};

const MINIMAL_HTML: &str = include_str!("../../templates/html/minimal.hbs");
const GLAMOUR_HTML: &str = include_str!("../../templates/html/glamour.hbs");
const BADGE_SVG: &str = include_str!("../../templates/svg/badge.svg");

pub(super) fn all() -> Vec<TemplateConfig> {
    vec![
        default_template(),
        modern_template(),
        minimal_template(),
        glamour_template(),
        badge_template(),
    ]
}

#[allow(clippy::too_many_arguments)]
fn field(
    key: &str,
    label: &str,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    font_size: f32,
    bold: bool,
    color: &str,
    max_lines: Option<usize>,
    required: bool,
) -> FieldLayout {
    FieldLayout {
        key: key.to_string(),
        label: label.to_string(),
        x,
        y,
        width,
        height,
        font_size,
        bold,
        color: color.to_string(),
        align: TextAlign::Left,
        max_lines,
        required,
    }
}

fn default_template() -> TemplateConfig {
    TemplateConfig {
        name: "default".to_string(),
        description: "Classic canvas design with the full field set".to_string(),
        spec: TemplateSpec::Canvas(CanvasTemplate {
            width: 800,
            height: 1000,
            background_color: "#f5f5f5".to_string(),
            photo: PhotoFrame {
                x: 50.0,
                y: 100.0,
                width: 200.0,
                height: 250.0,
                corner_radius: 10.0,
                border_width: 3.0,
                border_color: "#333".to_string(),
            },
            fields: vec![
                field("name", "Name", 50.0, 50.0, 700.0, 40.0, 28.0, true, "#2c3e50", None, true),
                field("nickname", "Nickname", 270.0, 120.0, 480.0, 30.0, 18.0, false, "#7f8c8d", None, false),
                field("department", "Department", 270.0, 160.0, 480.0, 30.0, 16.0, true, "#34495e", None, true),
                field("stateOfOrigin", "State of Origin", 270.0, 200.0, 480.0, 30.0, 16.0, false, "#34495e", None, true),
                field("mostChallengingCourse", "Most Challenging Course", 50.0, 380.0, 700.0, 60.0, 14.0, false, "#e74c3c", Some(2), true),
                field("favoriteCourse", "Favorite Course", 50.0, 460.0, 700.0, 60.0, 14.0, false, "#27ae60", Some(2), true),
                field("bestLevel", "Best Level", 50.0, 540.0, 340.0, 30.0, 14.0, false, "#8e44ad", None, true),
                field("hobbies", "Hobbies", 410.0, 540.0, 340.0, 60.0, 14.0, false, "#f39c12", Some(2), true),
                field("bestMoment", "Best Moment in School", 50.0, 620.0, 700.0, 80.0, 14.0, false, "#16a085", Some(3), true),
                field("worstExperience", "Worst Experience", 50.0, 720.0, 700.0, 80.0, 14.0, false, "#c0392b", Some(3), true),
                field("afterSchool", "After School Plans", 50.0, 820.0, 700.0, 60.0, 14.0, false, "#2980b9", Some(2), true),
                field("relationshipStatus", "Relationship Status", 50.0, 900.0, 700.0, 60.0, 14.0, false, "#e67e22", Some(2), true),
            ],
            decorations: vec![
                Decoration::Rectangle {
                    x: 0.0,
                    y: 0.0,
                    width: 800.0,
                    height: 10.0,
                    color: "#3498db".to_string(),
                },
                Decoration::Rectangle {
                    x: 0.0,
                    y: 990.0,
                    width: 800.0,
                    height: 10.0,
                    color: "#3498db".to_string(),
                },
            ],
        }),
    }
}

fn modern_template() -> TemplateConfig {
    TemplateConfig {
        name: "modern".to_string(),
        description: "Dark themed canvas design with a minimal field set".to_string(),
        spec: TemplateSpec::Canvas(CanvasTemplate {
            width: 600,
            height: 800,
            background_color: "#1a1a1a".to_string(),
            photo: PhotoFrame {
                x: 50.0,
                y: 80.0,
                width: 150.0,
                height: 200.0,
                corner_radius: 15.0,
                border_width: 4.0,
                border_color: "#ff6b6b".to_string(),
            },
            fields: vec![
                field("name", "Name", 220.0, 100.0, 330.0, 35.0, 24.0, true, "#ffffff", None, true),
                field("department", "Department", 220.0, 140.0, 330.0, 25.0, 14.0, false, "#ff6b6b", None, true),
                field("stateOfOrigin", "State", 220.0, 170.0, 330.0, 25.0, 14.0, false, "#4ecdc4", None, true),
                field("hobbies", "Hobbies", 50.0, 320.0, 500.0, 50.0, 12.0, false, "#ffe66d", Some(2), true),
                field("bestMoment", "Best Moment", 50.0, 390.0, 500.0, 70.0, 12.0, false, "#a8e6cf", Some(3), true),
                field("afterSchool", "Future Plans", 50.0, 480.0, 500.0, 70.0, 12.0, false, "#ffd93d", Some(3), true),
            ],
            decorations: vec![
                Decoration::Rectangle {
                    x: 0.0,
                    y: 0.0,
                    width: 600.0,
                    height: 5.0,
                    color: "#ff6b6b".to_string(),
                },
                Decoration::Rectangle {
                    x: 0.0,
                    y: 795.0,
                    width: 600.0,
                    height: 5.0,
                    color: "#ff6b6b".to_string(),
                },
                Decoration::Circle {
                    x: 550.0,
                    y: 50.0,
                    radius: 30.0,
                    color: "#4ecdc4".to_string(),
                },
            ],
        }),
    }
}

fn minimal_template() -> TemplateConfig {
    TemplateConfig {
        name: "minimal".to_string(),
        description: "Clean minimal page design with a typography focus".to_string(),
        spec: TemplateSpec::Html(HtmlTemplate {
            template_path: "templates/html/minimal.hbs".to_string(),
            style_override: None,
            capture: CaptureOptions {
                viewport_width: 600,
                viewport_height: 800,
                device_scale_factor: 2.0,
                format: CaptureFormat::Png,
                quality: None,
                full_page: false,
                clip: Some(ClipRect {
                    x: 0.0,
                    y: 0.0,
                    width: 600.0,
                    height: 800.0,
                }),
                wait_for_selector: None,
                delay_ms: Some(500),
            },
            fallback: MINIMAL_HTML,
        }),
    }
}

fn glamour_template() -> TemplateConfig {
    TemplateConfig {
        name: "glamour".to_string(),
        description: "Gradient page design with modern typography".to_string(),
        spec: TemplateSpec::Html(HtmlTemplate {
            template_path: "templates/html/glamour.hbs".to_string(),
            style_override: None,
            capture: CaptureOptions {
                viewport_width: 800,
                viewport_height: 1000,
                device_scale_factor: 2.0,
                format: CaptureFormat::Png,
                quality: None,
                full_page: false,
                clip: Some(ClipRect {
                    x: 0.0,
                    y: 0.0,
                    width: 800.0,
                    height: 1000.0,
                }),
                wait_for_selector: None,
                delay_ms: Some(1000),
            },
            fallback: GLAMOUR_HTML,
        }),
    }
}

fn badge_template() -> TemplateConfig {
    TemplateConfig {
        name: "badge".to_string(),
        description: "Badge-style vector design with clean geometry".to_string(),
        spec: TemplateSpec::Svg(SvgTemplate {
            width: 400,
            height: 500,
            template_path: "templates/svg/badge.svg".to_string(),
            placeholders: vec![
                binding("student-name", PlaceholderKind::Text, "name"),
                binding("student-department", PlaceholderKind::Text, "department"),
                binding("student-state", PlaceholderKind::Text, "stateOfOrigin"),
                binding("student-photo", PlaceholderKind::Image, "photoUrl"),
                binding("best-course", PlaceholderKind::Text, "favoriteCourse"),
                binding("hobbies-text", PlaceholderKind::Text, "hobbies"),
            ],
            fallback: BADGE_SVG,
        }),
    }
}

fn binding(id: &str, kind: PlaceholderKind, field: &str) -> PlaceholderBinding {
    PlaceholderBinding {
        id: id.to_string(),
        kind,
        field: field.to_string(),
        attribute: None,
    }
}
