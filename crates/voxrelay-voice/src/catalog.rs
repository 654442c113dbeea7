//! Voice catalog.

use voxrelay_core::{VoiceGender, VoiceInfo};

/// The neural voices offered to clients.
///
/// A free function so the catalog can be listed without a configured
/// engine.
#[must_use]
pub fn neural_voices() -> Vec<VoiceInfo> {
    vec![
        voice_info("en-US-JennyNeural", "Jenny", "en-US", VoiceGender::Female),
        voice_info("en-US-GuyNeural", "Guy", "en-US", VoiceGender::Male),
        voice_info("en-GB-SoniaNeural", "Sonia", "en-GB", VoiceGender::Female),
        voice_info("en-GB-RyanNeural", "Ryan", "en-GB", VoiceGender::Male),
        voice_info("en-AU-NatashaNeural", "Natasha", "en-AU", VoiceGender::Female),
        voice_info("en-AU-WilliamNeural", "William", "en-AU", VoiceGender::Male),
    ]
}

fn voice_info(id: &str, name: &str, locale: &str, gender: VoiceGender) -> VoiceInfo {
    VoiceInfo {
        id: id.to_string(),
        name: name.to_string(),
        locale: locale.to_string(),
        gender,
    }
}
