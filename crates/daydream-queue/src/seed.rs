// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in prompt lists and avatar seed generation.

use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;

use daydream_core::DisplayedPrompt;

/// Window contents used at bootstrap when none are configured.
pub const INITIAL_PROMPTS: &[&str] = &[
    "cyberpunk cityscape with neon lights --quality 3",
    "underwater scene with ((bioluminescent)) creatures --creativity 0.8",
    "forest with magical creatures and (((glowing plants))) --quality 2",
    "cosmic nebula with vibrant colors --creativity 0.7",
    "futuristic landscape with floating islands --quality 3",
    "post-apocalyptic desert with abandoned technology --quality 2.5",
    "steampunk airship battle in stormy skies --creativity 0.9",
    "crystalline cave with ((magical)) light reflections --quality 3",
    "ancient library with impossible architecture --creativity 0.8",
    "digital realm with data visualized as (((geometric structures))) --quality 2.5",
    "northern lights over snow-covered mountains --creativity 0.7",
    "microscopic view of exotic (((alien cells))) --quality 3",
];

/// System prompts submitted by the filler endpoint.
pub const FILLER_PROMPTS: &[&str] = &[
    "hyperrealistic portrait of an alien queen --quality 3",
    "fantasy castle floating among clouds at sunset --creativity 0.8",
    "cybernetic ((animal)) with glowing parts --quality 2",
    "dreamlike surreal landscape with impossible physics --creativity 0.9",
    "ancient ruins overgrown with (((luminescent plants))) --quality 3",
    "deep sea creature inspired by ((bioluminescent)) life --quality 2.5",
    "clockwork automaton with intricate mechanical details --creativity 0.8",
    "volcanic landscape with rivers of glowing (((molten lava))) --quality 3",
    "cosmic deity with stars and galaxies as part of its form --creativity 0.9",
    "psychedelic dreamscape with fractals and impossible colors --quality 2.5",
    "biomechanical fusion of nature and ((advanced technology)) --creativity 0.8",
    "crystal palace with rainbow light refractions --quality 3",
];

fn random_suffix(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

/// Avatar seed for a system prompt, e.g. `user-k3x9qa`.
pub fn avatar_seed() -> String {
    format!("user-{}", random_suffix(6))
}

/// Builds the bootstrap window from `configured`, or the built-in list if empty.
pub fn initial_window(configured: &[String]) -> Vec<DisplayedPrompt> {
    let texts: Vec<&str> = if configured.is_empty() {
        INITIAL_PROMPTS.to_vec()
    } else {
        configured.iter().map(String::as_str).collect()
    };

    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| DisplayedPrompt {
            text: text.to_string(),
            seed: format!("user-{i}-{}", random_suffix(6)),
            is_user: false,
            session_id: None,
        })
        .collect()
}

/// A random filler prompt text.
pub fn filler_prompt() -> &'static str {
    FILLER_PROMPTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(FILLER_PROMPTS[0])
}
