//! The `certpath quiz` command.

use anyhow::{Context as _, Result};

use certpath_core::session::QuizAdvance;

use super::progress::print_completion;
use super::Context;

pub async fn execute(ctx: &Context, module_id: &str, answers: &str) -> Result<()> {
    let answers = parse_answers(answers)?;
    let (_, session) = ctx.session().await?;

    let mut question = session.start_quiz(module_id).await?;
    if answers.len() != question.question_count {
        session.close_quiz().await;
        anyhow::bail!(
            "{} answer(s) given, quiz has {} question(s)",
            answers.len(),
            question.question_count
        );
    }

    loop {
        let choice = answers[question.question_index];
        session
            .submit_quiz_answer(question.question_index, choice)
            .await?;
        let feedback = session.confirm_quiz_answer().await?;
        let mark = if feedback.correct { "correct" } else { "wrong" };
        println!(
            "Q{}: {} -> {mark}",
            question.question_index + 1,
            question.prompt
        );

        match session.advance_quiz().await? {
            QuizAdvance::Next(next) => question = next,
            QuizAdvance::Passed { result, completion } => {
                println!(
                    "Passed: {}/{} (needed {}).",
                    result.score, result.total, result.threshold
                );
                print_completion(&completion);
                return Ok(());
            }
            QuizAdvance::PassedWhileLocked { result } => {
                println!(
                    "Passed: {}/{} (needed {}).",
                    result.score, result.total, result.threshold
                );
                println!("{module_id} is still locked; nothing was recorded.");
                return Ok(());
            }
            QuizAdvance::Failed { result } => {
                session.close_quiz().await;
                println!(
                    "Failed: {}/{} (needed {}). Review the material and try again.",
                    result.score, result.total, result.threshold
                );
                return Ok(());
            }
        }
    }
}

fn parse_answers(answers: &str) -> Result<Vec<usize>> {
    answers
        .split(',')
        .map(|a| {
            a.trim()
                .parse::<usize>()
                .with_context(|| format!("invalid answer: {a:?}"))
        })
        .collect()
}
