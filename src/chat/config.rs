use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// 預設的補全端點（OpenAI 相容的串流介面）。
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
/// 預設模型。
pub const DEFAULT_MODEL: &str = "llama3-70b-8192";
/// 預設讀取 API 金鑰的環境變數。
pub const DEFAULT_API_KEY_ENV: &str = "GROQ_API_KEY";
/// 預設取樣溫度。
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

const DEFAULT_ASSISTANT_NAME: &str = "Murmur";
const DEFAULT_SYSTEM_PROMPT: &str = "You are Murmur, a helpful AI assistant.";

/// 聊天設定的頂層結構，從工作區的 `config/chat.toml` 載入。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatSettings {
    /// 助理在介面上顯示的名稱。
    #[serde(default)]
    pub assistant_name: Option<String>,
    /// 補全端點的連線設定。
    #[serde(default)]
    pub api: CompletionApiConfig,
}

/// 補全端點的連線設定。欄位皆可省略，省略時使用內建預設值。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionApiConfig {
    /// 端點的完整 URL。
    #[serde(default)]
    pub base_url: Option<String>,
    /// 直接在設定中指定的 API 金鑰。
    #[serde(default)]
    pub api_key: Option<String>,
    /// 用於讀取 API 金鑰的環境變數名稱。
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// 要使用的模型名稱。
    #[serde(default)]
    pub model: Option<String>,
    /// 系統提示詞（System Prompt）。
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// 取樣溫度。
    #[serde(default)]
    pub temperature: Option<f32>,
    /// 附加到請求中的額外 HTTP 標頭。
    #[serde(default)]
    pub extra_headers: BTreeMap<String, String>,
}

impl ChatSettings {
    /// 從指定的工作區目錄讀取設定。
    /// `config/chat.toml` 不存在時回傳內建預設值。
    pub fn load(workspace_root: &Path) -> Result<Self> {
        let config_path = workspace_root.join("config/chat.toml");
        if config_path.exists() {
            let raw = fs::read_to_string(&config_path)
                .with_context(|| format!("reading chat settings {}", config_path.display()))?;
            let parsed: ChatSettings = toml::from_str(&raw)
                .with_context(|| format!("parsing chat settings {}", config_path.display()))?;
            Ok(parsed)
        } else {
            Ok(Self::default())
        }
    }

    pub fn assistant_name(&self) -> &str {
        self.assistant_name.as_deref().unwrap_or(DEFAULT_ASSISTANT_NAME)
    }
}

impl CompletionApiConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn system_prompt(&self) -> &str {
        self.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    /// 解析實際要使用的 API 金鑰。
    /// 優先順序：`api_key` 欄位 > `api_key_env` 環境變數 > 預設環境變數。
    pub fn resolved_api_key(&self) -> Option<String> {
        if let Some(key) = &self.api_key {
            Some(key.clone())
        } else if let Some(var) = &self.api_key_env {
            std::env::var(var).ok()
        } else {
            std::env::var(DEFAULT_API_KEY_ENV).ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_omitted_fields() {
        let settings: ChatSettings = toml::from_str("").unwrap();
        assert_eq!(settings.assistant_name(), DEFAULT_ASSISTANT_NAME);
        assert_eq!(settings.api.base_url(), DEFAULT_BASE_URL);
        assert_eq!(settings.api.model(), DEFAULT_MODEL);
        assert_eq!(settings.api.temperature(), DEFAULT_TEMPERATURE);
        assert!(settings.api.system_prompt().contains("Murmur"));
    }

    #[test]
    fn partial_config_parses() {
        let raw = r#"
            assistant_name = "Echo"

            [api]
            model = "mixtral-8x7b"
            temperature = 0.2

            [api.extra_headers]
            "x-team" = "demo"
        "#;
        let settings: ChatSettings = toml::from_str(raw).unwrap();
        assert_eq!(settings.assistant_name(), "Echo");
        assert_eq!(settings.api.model(), "mixtral-8x7b");
        assert_eq!(settings.api.temperature(), 0.2);
        assert_eq!(settings.api.extra_headers.get("x-team").unwrap(), "demo");
        assert_eq!(settings.api.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn explicit_api_key_wins_over_env() {
        // SAFETY: 測試程序單執行緒存取此變數。
        unsafe { std::env::set_var("MURMUR_TEST_KEY", "from-env") };
        let config = CompletionApiConfig {
            api_key: Some("direct".to_string()),
            api_key_env: Some("MURMUR_TEST_KEY".to_string()),
            ..Default::default()
        };
        assert_eq!(config.resolved_api_key().as_deref(), Some("direct"));

        let config = CompletionApiConfig {
            api_key_env: Some("MURMUR_TEST_KEY".to_string()),
            ..Default::default()
        };
        assert_eq!(config.resolved_api_key().as_deref(), Some("from-env"));
        unsafe { std::env::remove_var("MURMUR_TEST_KEY") };
    }
}
