use std::path::Path;

use console::Style;
use subscale_core::ImageViewEngine;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    path: Style,
    warn: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            path: Style::new().underlined(),
            warn: Style::new().yellow(),
        }
    }
}

pub struct RenderSummary<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub engine: &'a ImageViewEngine,
    pub tiles_drawn: usize,
}

pub fn print_render_summary(summary: &RenderSummary<'_>) {
    let s = Styles::new();
    let engine = summary.engine;

    println!();
    println!("  {}", s.title.apply_to("Subscale Render"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(15)));
    println!();
    println!("  {:<14}{}", s.label.apply_to("Input"), s.path.apply_to(summary.input.display()));
    println!("  {:<14}{}", s.label.apply_to("Output"), s.path.apply_to(summary.output.display()));
    println!();

    println!("  {}", s.header.apply_to("Viewport"));
    if let Some((w, h)) = engine.source_size() {
        println!("    {:<12}{}", s.label.apply_to("Source"), s.value.apply_to(format!("{}x{}", w, h)));
    }
    if let Some(rotation) = engine.applied_rotation() {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Rotation"),
            s.value.apply_to(format!("{}\u{b0}", rotation.degrees()))
        );
    }
    if let Some(scale) = engine.scale() {
        println!("    {:<12}{}", s.label.apply_to("Scale"), s.value.apply_to(format!("{:.4}", scale)));
    }
    if let Some(center) = engine.center() {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Center"),
            s.value.apply_to(format!("{:.1}, {:.1}", center.x, center.y))
        );
    }
    println!();

    let stats = engine.stats();
    println!("  {}", s.header.apply_to("Tiles"));
    println!("    {:<12}{}", s.label.apply_to("Drawn"), s.value.apply_to(summary.tiles_drawn));
    println!("    {:<12}{}", s.label.apply_to("Decoded"), s.value.apply_to(stats.applied));
    if let Some(pyramid) = engine.pyramid() {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Resident"),
            s.value.apply_to(format!("{} of {}", pyramid.resident_count(), pyramid.tile_count()))
        );
    }
    if stats.failed > 0 {
        println!("    {:<12}{}", s.label.apply_to("Failed"), s.warn.apply_to(stats.failed));
    }
    println!();
}
