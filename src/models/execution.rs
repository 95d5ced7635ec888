use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeExecutionResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    /// Milliseconds.
    pub execution_time: Option<f64>,
    /// Kilobytes.
    pub memory_usage: Option<u64>,
    /// Produced locally instead of by the judge.
    pub mocked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Javascript,
    Python,
    Java,
    Cpp,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::Javascript,
        Language::Python,
        Language::Java,
        Language::Cpp,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Language::Javascript => "JavaScript",
            Language::Python => "Python",
            Language::Java => "Java",
            Language::Cpp => "C++",
        }
    }

    /// Judge0 CE language ids.
    pub fn judge_id(&self) -> u32 {
        match self {
            Language::Javascript => 63,
            Language::Python => 71,
            Language::Java => 62,
            Language::Cpp => 54,
        }
    }

    pub fn cycle(&self) -> Self {
        match self {
            Language::Javascript => Language::Python,
            Language::Python => Language::Java,
            Language::Java => Language::Cpp,
            Language::Cpp => Language::Javascript,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "js" | "mjs" => Some(Language::Javascript),
            "py" => Some(Language::Python),
            "java" => Some(Language::Java),
            "cpp" | "cc" | "cxx" => Some(Language::Cpp),
            _ => None,
        }
    }

    /// File extension used when saving source to disk.
    pub fn extension(&self) -> &'static str {
        match self {
            Language::Javascript => "js",
            Language::Python => "py",
            Language::Java => "java",
            Language::Cpp => "cpp",
        }
    }

    pub fn template(&self) -> &'static str {
        match self {
            Language::Javascript => {
                r#"// JavaScript code template
function solution() {
    // Your solution here
    console.log("Hello, LeetCode!");
}

// Test cases
solution();
"#
            }
            Language::Python => {
                r#"# Python code template
def solution():
    # Your solution here
    print("Hello, LeetCode!")

# Test cases
if __name__ == "__main__":
    solution()
"#
            }
            Language::Java => {
                r#"// Java code template
public class Main {
    public static void main(String[] args) {
        // Your solution here
        System.out.println("Hello, LeetCode!");
    }
}
"#
            }
            Language::Cpp => {
                r#"// C++ code template
#include <iostream>
using namespace std;

int main() {
    // Your solution here
    cout << "Hello, LeetCode!" << endl;
    return 0;
}
"#
            }
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "javascript" | "js" => Ok(Language::Javascript),
            "python" | "python3" | "py" => Ok(Language::Python),
            "java" => Ok(Language::Java),
            "cpp" | "c++" => Ok(Language::Cpp),
            other => Err(format!("unsupported language: {other}")),
        }
    }
}
