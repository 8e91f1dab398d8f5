use std::path::Path;
use std::time::Duration;

use autodark_core::batch::{worker_count, BatchSummary};
use autodark_core::config::BatchConfig;
use console::Style;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    good: Style,
    warn: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            good: Style::new().green(),
            warn: Style::new().yellow(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_batch_header(config: &BatchConfig) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Autodark"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(8)));
    println!();

    print_dir(&s, "Input", Some(&config.input));
    print_dir(&s, "Output", Some(&config.output));
    print_dir(&s, "Darks", config.dark.as_deref());
    print_dir(&s, "Biases", config.bias.as_deref());
    if let Some(flat) = &config.flat {
        println!(
            "  {:<14}{} {}",
            s.label.apply_to("Flats"),
            s.path.apply_to(flat.display()),
            s.disabled.apply_to("(not applied)")
        );
    }
    println!();

    let t = &config.tolerances;
    println!("  {}", s.header.apply_to("Matching"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Time"),
        s.value.apply_to(format!("\u{00b1}{} s", t.max_time_diff_secs))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Exposure"),
        s.value.apply_to(format!("\u{2265}{}%", t.min_exposure_equality_pct))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Frames"),
        s.value.apply_to(format!("{}..{}", t.min_calfiles, t.max_calfiles))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Workers"),
        s.value.apply_to(worker_count(config.jobs_per_core))
    );
    println!();
}

fn print_dir(s: &Styles, label: &str, dir: Option<&Path>) {
    match dir {
        Some(dir) => println!(
            "  {:<14}{}",
            s.label.apply_to(label),
            s.path.apply_to(dir.display())
        ),
        None => println!("  {:<14}{}", s.label.apply_to(label), s.disabled.apply_to("none")),
    }
}

pub fn print_batch_summary(summary: &BatchSummary, elapsed: Duration) {
    let s = Styles::new();

    println!("  {}", s.header.apply_to("Summary"));
    println!(
        "    {:<14}{}",
        s.label.apply_to("Files"),
        s.value.apply_to(summary.total)
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Calibrated"),
        s.good.apply_to(summary.written)
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Skipped"),
        s.value.apply_to(summary.skipped)
    );
    print_count(&s, "Uncalibrated", summary.uncalibrated);
    print_count(&s, "Failed", summary.failed);
    if summary.unprocessed() > 0 {
        print_count(&s, "Not processed", summary.unprocessed());
    }
    println!(
        "    {:<14}{}",
        s.label.apply_to("Elapsed"),
        s.value.apply_to(format!("{:.1} s", elapsed.as_secs_f64()))
    );
    println!();
}

fn print_count(s: &Styles, label: &str, count: usize) {
    let style = if count > 0 { &s.warn } else { &s.value };
    println!("    {:<14}{}", s.label.apply_to(label), style.apply_to(count));
}
