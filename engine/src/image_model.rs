use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

pub mod replicate;

/// Shapes `(prompt, image data URI)` into the provider-specific `input` object.
pub type PayloadBuilder = fn(&str, &str) -> Value;

#[derive(Debug, Clone, Copy)]
pub struct ModelDescriptor {
    pub name: &'static str,
    pub id: &'static str,
    pub description: &'static str,
    pub build_input: PayloadBuilder,
}

impl ModelDescriptor {
    pub fn input(&self, prompt: &str, image_uri: &str) -> Value {
        (self.build_input)(prompt, image_uri)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Display,
    EnumString,
    clap::ValueEnum,
    Serialize,
    Deserialize,
    Hash,
    PartialEq,
    Eq,
    EnumIter,
    Default,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Model {
    #[default]
    NanoBanana,
    NanoBananaPro,
    FluxKontextPro,
    #[strum(serialize = "flux-1.1-pro")]
    #[serde(rename = "flux-1.1-pro")]
    #[value(name = "flux-1.1-pro")]
    Flux11Pro,
    QwenImageEdit,
    QwenImageEditPlus,
}

impl Model {
    pub fn descriptor(&self) -> ModelDescriptor {
        match self {
            Model::NanoBanana => ModelDescriptor {
                name: "nano-banana",
                id: "google/nano-banana",
                description: "Google Gemini 2.5 Flash - fast, good quality (default)",
                build_input: image_input_list,
            },
            Model::NanoBananaPro => ModelDescriptor {
                name: "nano-banana-pro",
                id: "google/nano-banana-pro",
                description: "Google Gemini 3 Pro - highest quality, text rendering",
                build_input: image_input_list,
            },
            Model::FluxKontextPro => ModelDescriptor {
                name: "flux-kontext-pro",
                id: "black-forest-labs/flux-kontext-pro",
                description: "FLUX Kontext Pro - strong image editing",
                build_input: kontext_input,
            },
            Model::Flux11Pro => ModelDescriptor {
                name: "flux-1.1-pro",
                id: "black-forest-labs/flux-1.1-pro",
                description: "FLUX 1.1 Pro - composition guidance",
                build_input: image_prompt_input,
            },
            Model::QwenImageEdit => ModelDescriptor {
                name: "qwen-image-edit",
                id: "qwen/qwen-image-edit",
                description: "Qwen Image Edit - precise text editing",
                build_input: single_image_input,
            },
            Model::QwenImageEditPlus => ModelDescriptor {
                name: "qwen-image-edit-plus",
                id: "qwen/qwen-image-edit-plus",
                description: "Qwen Image Edit Plus - enhanced editing",
                build_input: image_list_input,
            },
        }
    }

    pub fn all() -> impl Iterator<Item = ModelDescriptor> {
        Model::iter().map(|m| m.descriptor())
    }
}

/// Gemini image models take a list under `image_input`.
fn image_input_list(prompt: &str, image_uri: &str) -> Value {
    json!({
        "prompt": prompt,
        "image_input": [image_uri],
        "output_format": "png",
    })
}

fn kontext_input(prompt: &str, image_uri: &str) -> Value {
    json!({
        "prompt": prompt,
        "input_image": image_uri,
        "aspect_ratio": "match_input_image",
        "output_format": "png",
    })
}

/// Known limitation: FLUX 1.1 Pro only uses `image_prompt` as composition
/// guidance, it does not edit the photo. Kept as-is for comparison runs.
fn image_prompt_input(prompt: &str, image_uri: &str) -> Value {
    json!({
        "prompt": prompt,
        "image_prompt": image_uri,
        "aspect_ratio": "1:1",
        "output_format": "png",
    })
}

fn single_image_input(prompt: &str, image_uri: &str) -> Value {
    json!({
        "prompt": prompt,
        "image": image_uri,
        "output_format": "png",
    })
}

fn image_list_input(prompt: &str, image_uri: &str) -> Value {
    json!({
        "prompt": prompt,
        "image": [image_uri],
        "output_format": "png",
    })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use clap::ValueEnum;
    use expect_test::expect;

    use super::*;

    #[test]
    fn names_agree_across_strum_clap_and_descriptor() {
        for model in Model::iter() {
            let name = model.descriptor().name;
            assert_eq!(model.to_string(), name);
            assert_eq!(<Model as FromStr>::from_str(name).unwrap(), model);
            assert_eq!(model.to_possible_value().unwrap().get_name(), name);
        }
    }

    #[test]
    fn default_model_is_nano_banana() {
        assert_eq!(Model::default().descriptor().id, "google/nano-banana");
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert!(<Model as FromStr>::from_str("dall-e").is_err());
        assert!(<Model as ValueEnum>::from_str("dall-e", true).is_err());
    }

    #[test]
    fn payload_shapes() {
        let payloads: Vec<String> = Model::all()
            .map(|d| format!("{}: {}", d.name, d.input("P", "data:x")))
            .collect();

        expect![[r#"
            nano-banana: {"image_input":["data:x"],"output_format":"png","prompt":"P"}
            nano-banana-pro: {"image_input":["data:x"],"output_format":"png","prompt":"P"}
            flux-kontext-pro: {"aspect_ratio":"match_input_image","input_image":"data:x","output_format":"png","prompt":"P"}
            flux-1.1-pro: {"aspect_ratio":"1:1","image_prompt":"data:x","output_format":"png","prompt":"P"}
            qwen-image-edit: {"image":"data:x","output_format":"png","prompt":"P"}
            qwen-image-edit-plus: {"image":["data:x"],"output_format":"png","prompt":"P"}"#]]
        .assert_eq(&payloads.join("\n"));
    }
}
