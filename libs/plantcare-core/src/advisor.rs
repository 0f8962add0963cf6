//! Plant care advisor backed by a chat-completion language model
//!
//! The transport is left to the embedding application through
//! [`ChatTransport`]; this module builds requests, checks responses and turns
//! model output into typed results.

use crate::error::{PlantCareError, Result};
use crate::models::{
    CareStep, CareStepType, CompassDirection, HumidityLevel, LightType, Plant, Room, Zone,
};
use async_trait::async_trait;
use base64::Engine as _;
use plantcare_common::truncate_string;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Longest response excerpt written to logs
const LOG_EXCERPT_CHARS: usize = 200;

const SYSTEM_PROMPT: &str = "You are an experienced horticulturist helping someone care for \
their plants at home. Always answer with a single JSON object and nothing else.";

/// A room or zone the model may place a plant in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableSpace {
    pub id: Uuid,
    /// `room` or `zone`
    pub kind: String,
    pub name: String,
    /// Window directions of a room, or aspect and sun of a zone
    pub detail: String,
}

/// Describe rooms and zones for a prompt
#[must_use]
pub fn available_spaces(rooms: &[Room], zones: &[Zone]) -> Vec<AvailableSpace> {
    let rooms = rooms.iter().map(|room| {
        let windows: Vec<&str> = room.windows.iter().map(|w| w.direction.code()).collect();
        AvailableSpace {
            id: room.id,
            kind: "room".to_string(),
            name: room.name.clone(),
            detail: if windows.is_empty() {
                "no windows".to_string()
            } else {
                format!("windows facing {}", windows.join(", "))
            },
        }
    });
    let zones = zones.iter().map(|zone| AvailableSpace {
        id: zone.id,
        kind: "zone".to_string(),
        name: zone.name.clone(),
        detail: format!(
            "outdoors facing {}, about {:.1} hours of sun",
            zone.aspect.code(),
            zone.effective_sun_hours()
        ),
    });
    rooms.chain(zones).collect()
}

/// Care step as proposed by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareStepDescriptor {
    /// `watering`, `misting`, `dusting`, `rotation` or a custom name
    pub kind: String,
    #[serde(default)]
    pub instructions: String,
    pub frequency_days: i32,
}

impl CareStepDescriptor {
    fn step_type(&self) -> CareStepType {
        match self.kind.trim().to_ascii_lowercase().as_str() {
            "watering" | "water" => CareStepType::Watering,
            "misting" | "mist" => CareStepType::Misting,
            "dusting" | "dust" => CareStepType::Dusting,
            "rotation" | "rotate" => CareStepType::Rotation,
            _ => CareStepType::Custom {
                name: self.kind.trim().to_string(),
            },
        }
    }

    /// Convert to a care step; frequencies below one day become one day
    #[must_use]
    pub fn into_care_step(self) -> CareStep {
        let step_type = self.step_type();
        CareStep::new(step_type, self.instructions, self.frequency_days.max(1))
    }
}

/// A plant profile recommended by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantCareDescriptor {
    pub name: String,
    #[serde(default)]
    pub latin_name: Option<String>,
    pub light_type: LightType,
    #[serde(default)]
    pub preferred_direction: Option<CompassDirection>,
    #[serde(default)]
    pub humidity: Option<HumidityLevel>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub care_steps: Vec<CareStepDescriptor>,
    /// Room or zone id from the offered spaces
    #[serde(default)]
    pub suggested_space_id: Option<Uuid>,
}

impl PlantCareDescriptor {
    /// Build a new plant; the suggested space is used only if it names an
    /// existing room or zone
    #[must_use]
    pub fn into_plant(self, rooms: &[Room], zones: &[Zone]) -> Plant {
        let mut plant = Plant::new(self.name.trim(), self.light_type);
        plant.latin_name = self.latin_name.filter(|n| !n.trim().is_empty());
        if let Some(direction) = self.preferred_direction {
            plant.preferred_direction = direction;
        }
        plant.humidity = self.humidity;
        plant.notes = self.notes.unwrap_or_default();
        plant.care_steps = self
            .care_steps
            .into_iter()
            .map(CareStepDescriptor::into_care_step)
            .collect();

        if let Some(space_id) = self.suggested_space_id {
            if rooms.iter().any(|r| r.id == space_id) {
                plant.assign_to_room(space_id, None);
            } else if zones.iter().any(|z| z.id == space_id) {
                plant.assign_to_zone(space_id);
            } else {
                debug!("Ignoring unknown suggested space {}", space_id);
            }
        }
        plant
    }
}

/// New frequency for every care step of one kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyChange {
    pub kind: String,
    pub frequency_days: i32,
}

/// Edits the model proposes for an existing plant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestedChanges {
    #[serde(default)]
    pub light_type: Option<LightType>,
    #[serde(default)]
    pub preferred_direction: Option<CompassDirection>,
    #[serde(default)]
    pub humidity: Option<HumidityLevel>,
    /// Text appended to the plant's notes
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub frequency_changes: Vec<FrequencyChange>,
    #[serde(default)]
    pub new_care_steps: Vec<CareStepDescriptor>,
}

impl SuggestedChanges {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the edits to `plant`; returns the number of fields changed
    pub fn apply_to(&self, plant: &mut Plant) -> usize {
        let mut changed = 0;
        if let Some(light_type) = self.light_type {
            plant.light_type = light_type;
            changed += 1;
        }
        if let Some(direction) = self.preferred_direction {
            plant.preferred_direction = direction;
            changed += 1;
        }
        if let Some(humidity) = self.humidity {
            plant.humidity = Some(humidity);
            changed += 1;
        }
        if let Some(notes) = self.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            if plant.notes.is_empty() {
                plant.notes = notes.to_string();
            } else {
                plant.notes = format!("{}\n\n{}", plant.notes, notes);
            }
            changed += 1;
        }
        for change in &self.frequency_changes {
            let target = CareStepDescriptor {
                kind: change.kind.clone(),
                instructions: String::new(),
                frequency_days: change.frequency_days,
            }
            .step_type();
            for step in plant
                .care_steps
                .iter_mut()
                .filter(|s| s.step_type == target)
            {
                step.frequency_days = change.frequency_days.max(1);
                changed += 1;
            }
        }
        for step in &self.new_care_steps {
            plant.care_steps.push(step.clone().into_care_step());
            changed += 1;
        }
        changed
    }
}

/// Answer to a free-form question about a plant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisorAnswer {
    pub answer: String,
    #[serde(default)]
    pub suggested_changes: Option<SuggestedChanges>,
}

/// Result of identifying a plant from a photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantNameGuess {
    pub name: String,
    #[serde(default)]
    pub latin_name: Option<String>,
    /// Model's confidence between 0 and 1
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Language model operations used by the app
#[async_trait]
pub trait PlantAdvisor: Send + Sync {
    /// Recommend a care profile for a plant described in free text
    async fn generate_recommendation(
        &self,
        description: &str,
        spaces: &[AvailableSpace],
    ) -> Result<PlantCareDescriptor>;

    /// Answer a question about a plant, optionally looking at a photo
    async fn answer_question(
        &self,
        plant: &Plant,
        spaces: &[AvailableSpace],
        question: &str,
        photo: Option<&[u8]>,
    ) -> Result<AdvisorAnswer>;

    /// Name the plant in a photo
    async fn identify_plant(&self, photo: &[u8]) -> Result<PlantNameGuess>;
}

// Chat request construction

/// Image reference inside a chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Part of a chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Vec<ContentPart>,
}

/// Chat-completion request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub response_format: Value,
}

fn image_media_type(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        [b'G', b'I', b'F', ..] => "image/gif",
        _ => "image/jpeg",
    }
}

/// Encode an image as a base64 data URL
#[must_use]
pub fn image_data_url(bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        image_media_type(bytes),
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Build a request with a system message and one user message
#[must_use]
pub fn build_chat_request(
    model: &str,
    system_prompt: &str,
    user_text: &str,
    image: Option<&[u8]>,
) -> ChatRequest {
    let mut user_content = vec![ContentPart::Text {
        text: user_text.to_string(),
    }];
    if let Some(image) = image {
        user_content.push(ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: image_data_url(image),
            },
        });
    }
    ChatRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage {
                role: "system".to_string(),
                content: vec![ContentPart::Text {
                    text: system_prompt.to_string(),
                }],
            },
            ChatMessage {
                role: "user".to_string(),
                content: user_content,
            },
        ],
        response_format: serde_json::json!({ "type": "json_object" }),
    }
}

// Response handling

/// Map a non-2xx status to `HttpError`
///
/// # Errors
/// Returns `HttpError` with the status code for anything outside 200..300
pub fn error_for_status(status: u16, body: &str) -> Result<()> {
    if (200..300).contains(&status) {
        return Ok(());
    }
    warn!(
        status,
        "Advisor request failed: {}",
        truncate_string(body, LOG_EXCERPT_CHARS)
    );
    Err(PlantCareError::HttpError { code: status })
}

/// Text of the first choice of a chat-completion response body
///
/// # Errors
/// Returns `UpstreamError` if the body carries an error object and
/// `InvalidResponse` if it has no message content
pub fn extract_message_content(body: &str) -> Result<String> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| PlantCareError::invalid_response(format!("response is not JSON: {e}")))?;
    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| error.to_string(), str::to_string);
        return Err(PlantCareError::UpstreamError { message });
    }
    value
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| PlantCareError::invalid_response("response has no message content"))
}

/// Pull a JSON value out of model text
///
/// Accepts bare JSON, JSON inside a markdown code fence, or JSON surrounded
/// by prose (outermost object or array).
///
/// # Errors
/// Returns `InvalidResponse` if no JSON value can be found
pub fn extract_json_payload(text: &str) -> Result<Value> {
    let text = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok(value);
    }

    if let Some(fence) = text.find("```") {
        let after = &text[fence + 3..];
        // Skip the language tag line
        let body = after.find('\n').map_or(after, |nl| &after[nl + 1..]);
        if let Some(end) = body.find("```") {
            match serde_json::from_str::<Value>(body[..end].trim()) {
                Ok(value) => return Ok(value),
                Err(e) => debug!("Fenced block is not JSON: {}", e),
            }
        }
    }

    let candidates = [('{', '}'), ('[', ']')];
    let mut spans: Vec<(usize, usize)> = candidates
        .iter()
        .filter_map(|&(open, close)| Some((text.find(open)?, text.rfind(close)?)))
        .filter(|(start, end)| start < end)
        .collect();
    spans.sort_by_key(|&(start, _)| start);
    for (start, end) in spans {
        if let Ok(value) = serde_json::from_str::<Value>(&text[start..=end]) {
            return Ok(value);
        }
    }

    Err(PlantCareError::invalid_response(format!(
        "no JSON found in model output: {}",
        truncate_string(text, LOG_EXCERPT_CHARS)
    )))
}

/// Extract and decode a typed payload from model text
///
/// # Errors
/// Returns `InvalidResponse` if the text holds no JSON or it has the wrong shape
pub fn parse_payload<T: DeserializeOwned>(text: &str) -> Result<T> {
    let value = extract_json_payload(text)?;
    serde_json::from_value(value)
        .map_err(|e| PlantCareError::invalid_response(format!("unexpected payload shape: {e}")))
}

// Prompts

fn spaces_block(spaces: &[AvailableSpace]) -> String {
    if spaces.is_empty() {
        return "The user has not set up any rooms or zones.".to_string();
    }
    let lines: Vec<String> = spaces
        .iter()
        .map(|s| format!("- {} \"{}\" (id {}): {}", s.kind, s.name, s.id, s.detail))
        .collect();
    format!("Available spaces:\n{}", lines.join("\n"))
}

fn recommendation_prompt(description: &str, spaces: &[AvailableSpace]) -> String {
    format!(
        "Recommend a care profile for this plant: {description}\n\n{}\n\n\
         Reply with JSON fields: name, latin_name, light_type (direct|indirect|low), \
         preferred_direction (N|NE|E|SE|S|SW|W|NW), humidity (low|medium|high), notes, \
         care_steps (list of kind, instructions, frequency_days) and suggested_space_id \
         (one of the ids above, or null).",
        spaces_block(spaces)
    )
}

fn question_prompt(plant: &Plant, spaces: &[AvailableSpace], question: &str) -> String {
    let steps: Vec<String> = plant
        .care_steps
        .iter()
        .map(|s| format!("{} every {} days", s.display_name(), s.frequency_days))
        .collect();
    format!(
        "Plant: {} ({})\nCare: {}\nNotes: {}\n\n{}\n\nQuestion: {question}\n\n\
         Reply with JSON fields: answer (text) and suggested_changes (null, or an object \
         with optional light_type, preferred_direction, humidity, notes, frequency_changes \
         (list of kind, frequency_days) and new_care_steps).",
        plant.name,
        plant.latin_name.as_deref().unwrap_or("unknown species"),
        if steps.is_empty() {
            "none".to_string()
        } else {
            steps.join(", ")
        },
        if plant.notes.is_empty() {
            "none"
        } else {
            plant.notes.as_str()
        },
        spaces_block(spaces)
    )
}

const IDENTIFY_PROMPT: &str = "Identify the plant in this photo. Reply with JSON fields: \
name (common name), latin_name and confidence (0 to 1).";

/// Sends a chat request and returns the HTTP status and response body
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<(u16, String)>;
}

/// [`PlantAdvisor`] speaking the chat-completion format over a transport
#[derive(Debug, Clone)]
pub struct ChatAdvisor<T> {
    transport: T,
    model: String,
}

impl<T: ChatTransport> ChatAdvisor<T> {
    #[must_use]
    pub fn new(transport: T, model: impl Into<String>) -> Self {
        Self {
            transport,
            model: model.into(),
        }
    }

    async fn complete<R: DeserializeOwned>(
        &self,
        user_text: &str,
        image: Option<&[u8]>,
    ) -> Result<R> {
        let request = build_chat_request(&self.model, SYSTEM_PROMPT, user_text, image);
        let (status, body) = self.transport.send(&request).await?;
        error_for_status(status, &body)?;
        let content = extract_message_content(&body)?;
        parse_payload(&content)
    }
}

#[async_trait]
impl<T: ChatTransport> PlantAdvisor for ChatAdvisor<T> {
    #[instrument(skip(self, spaces))]
    async fn generate_recommendation(
        &self,
        description: &str,
        spaces: &[AvailableSpace],
    ) -> Result<PlantCareDescriptor> {
        self.complete(&recommendation_prompt(description, spaces), None)
            .await
    }

    #[instrument(skip(self, plant, spaces, photo), fields(plant = %plant.name))]
    async fn answer_question(
        &self,
        plant: &Plant,
        spaces: &[AvailableSpace],
        question: &str,
        photo: Option<&[u8]>,
    ) -> Result<AdvisorAnswer> {
        self.complete(&question_prompt(plant, spaces, question), photo)
            .await
    }

    #[instrument(skip_all)]
    async fn identify_plant(&self, photo: &[u8]) -> Result<PlantNameGuess> {
        self.complete(IDENTIFY_PROMPT, Some(photo)).await
    }
}
