//! One-line status output for the headless presentation loop.

use std::sync::atomic::Ordering;

use owo_colors::OwoColorize;
use snapline_core::{AppContext, BulletSnapshot, EntityRecord, WorldSnapshot};

/// Print the current state of `context` to stdout.
pub fn print_status(context: &AppContext) {
    let world = context.world_snapshot();
    let bullets = context.bullet_snapshot();
    let target = context.current_target();
    let stats = context.redirect_stats();

    println!(
        "{} {} {} {}",
        world_summary(&world).cyan(),
        bullet_summary(&bullets).yellow(),
        target_summary(target.as_ref()).green(),
        format!(
            "redirected {} / failed {}",
            stats.redirected.load(Ordering::Relaxed),
            stats.failed.load(Ordering::Relaxed)
        )
        .dimmed()
    );
}

fn world_summary(world: &WorldSnapshot) -> String {
    let on_screen = world.entities.iter().filter(|e| e.is_on_screen()).count();
    format!(
        "[world #{}] {} entities ({} on screen) {:.2}ms",
        world.generation,
        world.entities.len(),
        on_screen,
        world.production_time.as_secs_f64() * 1000.0
    )
}

fn bullet_summary(bullets: &BulletSnapshot) -> String {
    format!("[bullets] {} tracked, {} frozen", bullets.len(), bullets.frozen)
}

fn target_summary(target: Option<&EntityRecord>) -> String {
    match target {
        Some(t) if t.name.is_empty() => format!(
            "[target] {} {:#x} {:.1}m hp {:.0}%",
            t.category,
            t.address,
            t.distance,
            t.health_percent() * 100.0
        ),
        Some(t) => format!(
            "[target] {} '{}' {:.1}m hp {:.0}%",
            t.category,
            t.name,
            t.distance,
            t.health_percent() * 100.0
        ),
        None => "[target] none".to_string(),
    }
}
