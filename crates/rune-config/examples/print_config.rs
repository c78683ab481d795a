/// Example program to print the loaded configuration
///
/// Run with: cargo run -p rune-config --example print_config

fn main() {
    // Load configuration from rune.toml
    let config = rune_config::RuneConfig::load();

    println!("=== Rune Configuration ===\n");

    println!("Motion Settings:");
    println!("  Animations Enabled: {}", config.motion.animations_enabled);
    println!("  Frame Interval: {} ms", config.motion.frame_interval_ms);
    println!(
        "  Theme Transition: {} ({} ms, stagger {} ms)",
        config.motion.theme_transition,
        config.motion.theme_transition_duration_ms,
        config.motion.theme_stagger_delay_ms
    );
    println!("  Theme Start Darken: {}", config.motion.theme_start_darken);
    println!("  Reveal Stagger: {} ms", config.motion.reveal_stagger_delay_ms);
    println!();

    println!("Theme Settings:");
    println!("  Mode: {}", config.theme.mode);
    for (name, hex) in &config.theme.custom_colors {
        println!("  {} = {}", name, hex);
    }
    println!();

    match toml::to_string_pretty(&config) {
        Ok(toml_str) => {
            println!("=== Serialized Configuration ===");
            println!("{}", toml_str);
        }
        Err(e) => {
            eprintln!("Failed to serialize config: {}", e);
        }
    }
}
