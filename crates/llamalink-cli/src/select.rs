//! Interactive model selection.

use colored::Colorize;
use dialoguer::Input;

/// Parse comma-separated 1-based model numbers into 0-based indices.
///
/// Out-of-range and non-numeric items are ignored. The result is in list
/// order without repeats, whatever order the numbers were typed in.
pub fn parse_selection(input: &str, count: usize) -> Vec<usize> {
    let mut selected: Vec<usize> = input
        .split(',')
        .filter_map(|item| item.trim().parse::<usize>().ok())
        .filter(|number| (1..=count).contains(number))
        .map(|number| number - 1)
        .collect();
    selected.sort_unstable();
    selected.dedup();
    selected
}

/// Ask which of `count` listed models to link. Empty input selects all.
pub fn prompt_selection(count: usize) -> anyhow::Result<Vec<usize>> {
    println!();
    let input: String = Input::new()
        .with_prompt(
            "Enter the model numbers (comma-separated), or press Enter to link all"
                .bright_white()
                .to_string(),
        )
        .allow_empty(true)
        .interact_text()?;

    if input.trim().is_empty() {
        return Ok((0..count).collect());
    }
    Ok(parse_selection(&input, count))
}
