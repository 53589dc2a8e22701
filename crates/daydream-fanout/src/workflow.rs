// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The fixed depth-conditioned img2img workflow sent to every gateway.
//!
//! Only three values vary between requests: the positive prompt text
//! (node 5), the sampler steps (node 7) and the ControlNet strength (node 9).

use serde_json::{Value, json};

use crate::directives::Directives;

/// Sampler seed shared by every update so frames stay coherent.
pub const SAMPLER_SEED: u64 = 785_664_736_216_738;

pub const LATENT_WIDTH: u32 = 512;
pub const LATENT_HEIGHT: u32 = 512;

/// Builds the `/update` request body for a parsed prompt.
pub fn build_update(directives: &Directives) -> Value {
    json!({
        "prompt": {
            "1": {
                "_meta": { "title": "Load Image" },
                "inputs": { "image": "example.png" },
                "class_type": "LoadImage"
            },
            "2": {
                "_meta": { "title": "Depth Anything Tensorrt" },
                "inputs": {
                    "engine": "depth_anything_vitl14-fp16.engine",
                    "images": ["1", 0]
                },
                "class_type": "DepthAnythingTensorrt"
            },
            "3": {
                "_meta": { "title": "TensorRT Loader" },
                "inputs": {
                    "unet_name": "static-dreamshaper8_SD15_$stat-b-1-h-512-w-512_00001_.engine",
                    "model_type": "SD15"
                },
                "class_type": "TensorRTLoader"
            },
            "5": {
                "_meta": { "title": "CLIP Text Encode (Prompt)" },
                "inputs": { "clip": ["23", 0], "text": directives.text },
                "class_type": "CLIPTextEncode"
            },
            "6": {
                "_meta": { "title": "CLIP Text Encode (Prompt)" },
                "inputs": { "clip": ["23", 0], "text": "" },
                "class_type": "CLIPTextEncode"
            },
            "7": {
                "_meta": { "title": "KSampler" },
                "inputs": {
                    "cfg": 1,
                    "seed": SAMPLER_SEED,
                    "model": ["24", 0],
                    "steps": directives.steps(),
                    "denoise": 1,
                    "negative": ["9", 1],
                    "positive": ["9", 0],
                    "scheduler": "normal",
                    "latent_image": ["16", 0],
                    "sampler_name": "lcm"
                },
                "class_type": "KSampler"
            },
            "8": {
                "_meta": { "title": "Load ControlNet Model" },
                "inputs": { "control_net_name": "control_v11f1p_sd15_depth_fp16.safetensors" },
                "class_type": "ControlNetLoader"
            },
            "9": {
                "_meta": { "title": "Apply ControlNet" },
                "inputs": {
                    "image": ["2", 0],
                    "negative": ["6", 0],
                    "positive": ["5", 0],
                    "strength": directives.creativity,
                    "control_net": ["10", 0],
                    "end_percent": 1,
                    "start_percent": 0
                },
                "class_type": "ControlNetApplyAdvanced"
            },
            "10": {
                "_meta": { "title": "TorchCompileLoadControlNet" },
                "inputs": {
                    "mode": "reduce-overhead",
                    "backend": "inductor",
                    "fullgraph": false,
                    "controlnet": ["8", 0]
                },
                "class_type": "TorchCompileLoadControlNet"
            },
            "11": {
                "_meta": { "title": "Load VAE" },
                "inputs": { "vae_name": "taesd" },
                "class_type": "VAELoader"
            },
            "13": {
                "_meta": { "title": "TorchCompileLoadVAE" },
                "inputs": {
                    "vae": ["11", 0],
                    "mode": "reduce-overhead",
                    "backend": "inductor",
                    "fullgraph": true,
                    "compile_decoder": true,
                    "compile_encoder": true
                },
                "class_type": "TorchCompileLoadVAE"
            },
            "14": {
                "_meta": { "title": "VAE Decode" },
                "inputs": { "vae": ["13", 0], "samples": ["7", 0] },
                "class_type": "VAEDecode"
            },
            "15": {
                "_meta": { "title": "Preview Image" },
                "inputs": { "images": ["14", 0] },
                "class_type": "PreviewImage"
            },
            "16": {
                "_meta": { "title": "Empty Latent Image" },
                "inputs": {
                    "width": LATENT_WIDTH,
                    "height": LATENT_HEIGHT,
                    "batch_size": 1
                },
                "class_type": "EmptyLatentImage"
            },
            "23": {
                "_meta": { "title": "Load CLIP" },
                "inputs": {
                    "type": "stable_diffusion",
                    "device": "default",
                    "clip_name": "CLIPText/model.fp16.safetensors"
                },
                "class_type": "CLIPLoader"
            },
            "24": {
                "_meta": { "title": "Feature Bank Attention Processor" },
                "inputs": {
                    "model": ["3", 0],
                    "use_feature_injection": false,
                    "feature_cache_interval": 4,
                    "feature_bank_max_frames": 4,
                    "feature_injection_strength": 0.8,
                    "feature_similarity_threshold": 0.98
                },
                "class_type": "FeatureBankAttentionProcessor"
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_the_three_variable_fields() {
        let body = build_update(&Directives::parse("aurora --quality 4.9 --creativity 0.3"));
        let prompt = &body["prompt"];
        assert_eq!(prompt["5"]["inputs"]["text"], "aurora");
        assert_eq!(prompt["7"]["inputs"]["steps"], 4);
        assert_eq!(prompt["9"]["inputs"]["strength"], 0.3);
    }

    #[test]
    fn fixed_fields_stay_put() {
        let body = build_update(&Directives::parse("plain"));
        let prompt = &body["prompt"];
        assert_eq!(prompt["7"]["inputs"]["seed"], SAMPLER_SEED);
        assert_eq!(prompt["7"]["inputs"]["sampler_name"], "lcm");
        assert_eq!(prompt["6"]["inputs"]["text"], "");
        assert_eq!(prompt["16"]["inputs"]["width"], 512);
        assert_eq!(prompt["16"]["inputs"]["height"], 512);
        assert_eq!(prompt.as_object().map(|o| o.len()), Some(16));
    }
}
