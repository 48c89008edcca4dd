//! The `certpath init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("certpath.toml").exists() {
        println!("certpath.toml already exists, skipping.");
    } else {
        std::fs::write("certpath.toml", SAMPLE_CONFIG)?;
        println!("Created certpath.toml");
    }

    let catalog_path = std::path::Path::new("catalog.toml");
    if catalog_path.exists() {
        println!("catalog.toml already exists, skipping.");
    } else {
        std::fs::write(catalog_path, EXAMPLE_CATALOG)?;
        println!("Created catalog.toml");
    }

    println!("\nNext steps:");
    println!("  1. Run: certpath validate");
    println!("  2. Run: certpath status");
    println!("  3. Run: certpath watch --module welcome");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# certpath configuration

data_dir = "certpath-data"
catalog = "catalog.toml"
default_user = "learner"

[engine]
pass_ratio = 0.8
override_policy = "bypass"

[playback]
period_ms = 100
step = 10
"#;

const EXAMPLE_CATALOG: &str = r#"[pathway]
id = "sprint-coach"
name = "Sprint Coach Certification"
description = "Foundations of coaching sprint athletes"

[[modules]]
id = "welcome"
title = "Welcome to the Track"
description = "A short tour of the program"
icon = "video"
xp_reward = 100

[[modules]]
id = "mechanics"
title = "Sprint Mechanics"
description = "Posture, foot strike and arm action"
icon = "quiz"
xp_reward = 250

[[modules]]
id = "certified"
title = "Certification"
description = "Claim your coaching certificate"
icon = "trophy"
xp_reward = 500

[[quizzes]]
title = "Sprint Mechanics"

[[quizzes.questions]]
question = "Where should the foot strike during max velocity?"
options = ["Heel first", "Under the hips", "Far in front of the body"]
correct_answer = 1

[[quizzes.questions]]
question = "Arm swing is driven from the..."
options = ["Shoulder", "Elbow", "Wrist"]
correct_answer = 0

[[quizzes.questions]]
question = "During acceleration the torso should be..."
options = ["Upright", "Leaning back", "Inclined forward"]
correct_answer = 2
"#;
