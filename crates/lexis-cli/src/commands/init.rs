//! The `lexis init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    if Path::new(lexis_store::config::CONFIG_FILE).exists() {
        println!("lexis.toml already exists, skipping.");
    } else {
        std::fs::write(lexis_store::config::CONFIG_FILE, SAMPLE_CONFIG)?;
        println!("Created lexis.toml");
    }

    std::fs::create_dir_all("topics")?;
    std::fs::create_dir_all("users")?;
    let sample_path = Path::new("topics/greetings.json");
    if sample_path.exists() {
        println!("topics/greetings.json already exists, skipping.");
    } else {
        std::fs::write(sample_path, SAMPLE_TOPIC)?;
        println!("Created topics/greetings.json");
    }

    println!("\nNext steps:");
    println!("  1. Set default_learner in lexis.toml (or pass --learner)");
    println!("  2. Run: lexis browse --topic greetings");
    println!("  3. Run: lexis add --topic greetings --all, then lexis learn");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# lexis configuration

data_dir = "./users"
topics_dir = "./topics"
# default_learner = "your-name"

[scheduler]
initial_interval_hours = 4.0
initial_ease = 2.5
ease_bonus = 0.1
ease_penalty = 0.2
lapse_floor_hours = 2.0
mastery_threshold = 5
# max_ease = 3.5
# "deferred": added words wait for one learning pass; "immediate": scheduled at once
intake_mode = "deferred"
"#;

const SAMPLE_TOPIC: &str = r#"{
  "word_1": {
    "word": "hello",
    "pos": "(interj)",
    "meaning": "xin chào",
    "example": "Hello, how are you?",
    "example_meaning": "Xin chào, bạn khỏe không?"
  },
  "word_2": {
    "word": "goodbye",
    "pos": "(interj)",
    "meaning": "tạm biệt",
    "example": "Goodbye, see you tomorrow.",
    "example_meaning": "Tạm biệt, hẹn gặp lại ngày mai."
  },
  "word_3": {
    "word": "thanks",
    "pos": "(n)",
    "meaning": "lời cảm ơn",
    "example": "Thanks for your help.",
    "example_meaning": "Cảm ơn vì sự giúp đỡ của bạn."
  },
  "word_4": {
    "word": "welcome",
    "pos": "(v)",
    "meaning": "chào đón",
    "example": "They welcomed us warmly.",
    "example_meaning": "Họ chào đón chúng tôi nồng nhiệt."
  },
  "word_5": {
    "word": "sorry",
    "pos": "(adj)",
    "meaning": "xin lỗi",
    "example": "Sorry, I am late.",
    "example_meaning": "Xin lỗi, tôi đến muộn."
  }
}
"#;
