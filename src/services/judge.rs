use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{CodeExecutionResult, Language};

const STATUS_IN_QUEUE: u32 = 1;
const STATUS_PROCESSING: u32 = 2;
const STATUS_ACCEPTED: u32 = 3;

#[derive(Debug, Serialize)]
struct SubmissionRequest<'a> {
    source_code: &'a str,
    language_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stdin: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SubmissionToken {
    token: String,
}

#[derive(Debug, Deserialize)]
struct SubmissionStatus {
    id: u32,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct Submission {
    stdout: Option<String>,
    stderr: Option<String>,
    compile_output: Option<String>,
    message: Option<String>,
    status: SubmissionStatus,
    /// Seconds, as a decimal string.
    time: Option<String>,
    /// Kilobytes.
    memory: Option<u64>,
}

impl Submission {
    fn is_pending(&self) -> bool {
        matches!(self.status.id, STATUS_IN_QUEUE | STATUS_PROCESSING)
    }

    fn into_result(self) -> CodeExecutionResult {
        let execution_time = self
            .time
            .as_deref()
            .and_then(|t| t.parse::<f64>().ok())
            .map(|secs| secs * 1000.0);
        let output = self.stdout.unwrap_or_default();

        if self.status.id == STATUS_ACCEPTED {
            return CodeExecutionResult {
                success: true,
                output,
                error: None,
                execution_time,
                memory_usage: self.memory,
                mocked: false,
            };
        }

        let error = [self.compile_output, self.stderr, self.message]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
            .unwrap_or(self.status.description);

        CodeExecutionResult {
            success: false,
            output,
            error: Some(error),
            execution_time,
            memory_usage: self.memory,
            mocked: false,
        }
    }
}

/// Client for a Judge0-compatible execution API.
pub struct JudgeClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    max_polls: u32,
    poll_interval: Duration,
}

impl JudgeClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        max_polls: u32,
        poll_interval: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            max_polls,
            poll_interval,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Runs on the judge, falling back to a local mock when there is no key or the call fails.
    pub async fn execute(
        &self,
        language: Language,
        source: &str,
        stdin: Option<&str>,
    ) -> CodeExecutionResult {
        if !self.has_api_key() {
            tracing::debug!("No judge API key configured, mocking execution");
            return mock_execute(language, source);
        }

        match self.run_remote(language, source, stdin).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Judge execution failed, falling back to mock: {}", e);
                mock_execute(language, source)
            }
        }
    }

    pub async fn run_remote(
        &self,
        language: Language,
        source: &str,
        stdin: Option<&str>,
    ) -> Result<CodeExecutionResult> {
        let token = self.submit(language, source, stdin).await?;
        tracing::debug!("Submitted to judge, token {}", token);

        for attempt in 1..=self.max_polls {
            tokio::time::sleep(self.poll_interval).await;
            let submission = self.fetch(&token).await?;
            if !submission.is_pending() {
                return Ok(submission.into_result());
            }
            tracing::debug!("Submission {} still pending (poll {})", token, attempt);
        }

        Err(AppError::Judge(format!(
            "No result after {} polls",
            self.max_polls
        )))
    }

    async fn submit(&self, language: Language, source: &str, stdin: Option<&str>) -> Result<String> {
        let request = SubmissionRequest {
            source_code: source,
            language_id: language.judge_id(),
            stdin,
        };
        let response = self
            .authorized(self.client.post(format!("{}/submissions", self.base_url)))
            .query(&[("base64_encoded", "false"), ("wait", "false")])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AppError::Judge(format!("Submit failed: {}", error_text)));
        }

        let token: SubmissionToken = response.json().await?;
        Ok(token.token)
    }

    async fn fetch(&self, token: &str) -> Result<Submission> {
        let url = format!(
            "{}/submissions/{}",
            self.base_url,
            urlencoding::encode(token)
        );
        let response = self
            .authorized(self.client.get(url))
            .query(&[
                ("base64_encoded", "false"),
                ("fields", "stdout,stderr,compile_output,message,status,time,memory"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AppError::Judge(format!("Poll failed: {}", error_text)));
        }

        Ok(response.json().await?)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let Some(key) = &self.api_key else {
            return request;
        };
        let request = request.header("X-RapidAPI-Key", key);
        match url::Url::parse(&self.base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
        {
            Some(host) => request.header("X-RapidAPI-Host", host),
            None => request,
        }
    }
}

fn print_pattern(language: Language) -> &'static Regex {
    static PATTERNS: OnceLock<[Regex; 4]> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        [
            r#"console\.log\(\s*["'`]([^"'`]*)["'`]"#,
            r#"print\(\s*["']([^"']*)["']"#,
            r#"System\.out\.print(?:ln)?\(\s*"([^"]*)""#,
            r#"cout\s*<<\s*"([^"]*)""#,
        ]
        .map(|p| Regex::new(p).expect("print pattern is valid"))
    });
    let index = match language {
        Language::Javascript => 0,
        Language::Python => 1,
        Language::Java => 2,
        Language::Cpp => 3,
    };
    &patterns[index]
}

/// Local stand-in for the judge: echoes string literals the program prints.
pub fn mock_execute(language: Language, source: &str) -> CodeExecutionResult {
    let lines: Vec<&str> = print_pattern(language)
        .captures_iter(source)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str())
        .collect();

    let output = if lines.is_empty() {
        "Code executed successfully\n".to_string()
    } else {
        let mut out = lines.join("\n");
        out.push('\n');
        out
    };

    CodeExecutionResult {
        success: true,
        output,
        error: None,
        execution_time: None,
        memory_usage: None,
        mocked: true,
    }
}
