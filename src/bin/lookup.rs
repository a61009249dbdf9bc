use anyhow::{Context, Result};

use h2h_terminal::config::AppConfig;
use h2h_terminal::provider::Services;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let mut args = std::env::args().skip(1);
    let Some(name) = args.next() else {
        eprintln!("usage: lookup <player> [<opponent>]");
        return Ok(());
    };
    let opponent = args.next();

    let cfg = AppConfig::from_env();
    let services = Services::from_config(&cfg, None);
    println!("Backend: {}", cfg.backend_label());

    let player = services
        .directory
        .player(&name)
        .with_context(|| format!("look up {name}"))?;
    println!(
        "{} | {} | rank {} (best {}) | age {} | {} cm | {}",
        player.name,
        player.country.as_deref().unwrap_or("-"),
        opt(player.rank),
        opt(player.min_rank),
        opt(player.age),
        opt(player.height_cm),
        player.hand.as_deref().unwrap_or("-"),
    );

    let Some(opponent) = opponent else {
        return Ok(());
    };
    let h2h = services
        .directory
        .head_to_head(&player.name, &opponent)
        .with_context(|| format!("head-to-head {} vs {opponent}", player.name))?;
    let (left, right) = h2h.percentages();
    if h2h.met {
        println!(
            "H2H {} vs {opponent}: {}-{} ({left}% / {right}%)",
            player.name, h2h.p1_wins, h2h.p2_wins
        );
    } else {
        println!("H2H {} vs {opponent}: never met", player.name);
    }
    Ok(())
}

fn opt(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
