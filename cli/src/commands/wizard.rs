use anyhow::{Result, bail};

use wellnoosh_core::planner::MEALS_PER_DAY;
use wellnoosh_core::profile::{ACTIVITY_LEVELS, DIET_STYLES, HEALTH_GOALS, kg_to_lbs};
use wellnoosh_core::service::{WellnooshService, WizardCompletion};
use wellnoosh_core::wizard::{
    DAILY_ACTIVITIES, Question, QuestionnaireAnswer, ReassessmentStep, STOMACH_COMFORT, Wizard,
    WizardEvent, WizardState,
};

use super::helpers::{parse_choice, parse_multi_choice, parse_weight, print_json, prompt_line};
use super::plan::print_week;
use super::profile::print_assessment;

/// Feed one line of user input to the wizard.
///
/// `b` goes back. On multi-select steps numbers toggle options and an empty
/// line continues; on single-choice steps a number selects and continues.
fn handle_line(wizard: &mut Wizard, line: &str) -> Result<()> {
    let line = line.trim();
    if line.eq_ignore_ascii_case("b") || line.eq_ignore_ascii_case("back") {
        wizard.apply(WizardEvent::Back)?;
        return Ok(());
    }
    if line.is_empty() {
        wizard.apply(WizardEvent::Next)?;
        return Ok(());
    }

    let state = wizard.state().clone();
    match state {
        WizardState::GoalReassessment(ReassessmentStep::HealthGoals) => {
            for idx in parse_multi_choice(line, HEALTH_GOALS.len())? {
                wizard.apply(WizardEvent::ToggleGoal(HEALTH_GOALS[idx]))?;
            }
        }
        WizardState::GoalReassessment(ReassessmentStep::DietStyle) => {
            for idx in parse_multi_choice(line, DIET_STYLES.len())? {
                wizard.apply(WizardEvent::ToggleDietStyle(DIET_STYLES[idx]))?;
            }
        }
        WizardState::GoalReassessment(ReassessmentStep::ActivityLevel) => {
            let idx = parse_choice(line, ACTIVITY_LEVELS.len())?;
            wizard.apply(WizardEvent::SelectActivity(ACTIVITY_LEVELS[idx]))?;
            wizard.apply(WizardEvent::Next)?;
        }
        WizardState::WeightUpdate => {
            let (kg, _) = parse_weight(line)?;
            wizard.apply(WizardEvent::SetCurrentWeight(kg))?;
            wizard.apply(WizardEvent::Next)?;
        }
        WizardState::WeightGoal => {
            let (kg, _) = parse_weight(line)?;
            wizard.apply(WizardEvent::SetGoalWeight(kg))?;
            wizard.apply(WizardEvent::Next)?;
        }
        WizardState::Questionnaire(question) => {
            let answer = match question {
                Question::DailyActivity => QuestionnaireAnswer::DailyActivity(
                    DAILY_ACTIVITIES[parse_choice(line, DAILY_ACTIVITIES.len())?],
                ),
                Question::MealsPerDay => QuestionnaireAnswer::MealsPerDay(
                    MEALS_PER_DAY[parse_choice(line, MEALS_PER_DAY.len())?],
                ),
                Question::StomachComfort => QuestionnaireAnswer::StomachComfort(
                    STOMACH_COMFORT[parse_choice(line, STOMACH_COMFORT.len())?],
                ),
            };
            wizard.apply(WizardEvent::Answer(answer))?;
            wizard.apply(WizardEvent::Next)?;
        }
        WizardState::MealPlanGenerated(_) => bail!("The wizard has already finished"),
    }
    Ok(())
}

fn marked<T: PartialEq + std::fmt::Display>(options: &[T], selected: impl Fn(&T) -> bool) {
    for (i, option) in options.iter().enumerate() {
        let mark = if selected(option) { "x" } else { " " };
        eprintln!("  [{mark}] {}. {option}", i + 1);
    }
}

fn show_step(wizard: &Wizard) {
    let (step, total) = wizard.progress();
    let profile = wizard.profile();
    eprintln!("\nStep {} of {total}", step + 1);
    match wizard.state() {
        WizardState::GoalReassessment(ReassessmentStep::HealthGoals) => {
            eprintln!("What are your health goals? (numbers toggle, Enter continues)");
            marked(HEALTH_GOALS, |g| profile.health_goals.contains(g));
        }
        WizardState::GoalReassessment(ReassessmentStep::ActivityLevel) => {
            eprintln!("How active are you? (Enter keeps the current choice)");
            marked(ACTIVITY_LEVELS, |a| *a == profile.activity_level);
        }
        WizardState::GoalReassessment(ReassessmentStep::DietStyle) => {
            eprintln!("Which diet styles do you follow? (numbers toggle, Enter continues)");
            marked(DIET_STYLES, |d| profile.diet_styles.contains(d));
        }
        WizardState::WeightUpdate => {
            eprintln!(
                "What is your current weight? [{:.1} kg / {:.1} lbs]",
                profile.weight_kg,
                kg_to_lbs(profile.weight_kg)
            );
        }
        WizardState::WeightGoal => {
            eprintln!(
                "What is your goal weight? [{:.1} kg]",
                wizard.goal_weight_kg()
            );
        }
        WizardState::Questionnaire(question) => {
            eprintln!("{}", question.prompt());
            match question {
                Question::DailyActivity => marked(DAILY_ACTIVITIES, |_| false),
                Question::MealsPerDay => {
                    for (i, m) in MEALS_PER_DAY.iter().enumerate() {
                        eprintln!("  {}. {} - {}", i + 1, m.label(), m.description());
                    }
                }
                Question::StomachComfort => marked(STOMACH_COMFORT, |_| false),
            }
        }
        WizardState::MealPlanGenerated(_) => {}
    }
}

fn print_completion(done: &WizardCompletion) {
    println!();
    print_assessment(&done.outcome.assessment);
    println!();
    println!(
        "Created \"{}\" with {} meals ({} to {})",
        done.plan.name,
        done.meals.len(),
        done.plan.start_date,
        done.plan.end_date
    );
    print_week(&done.meals);
}

pub(crate) async fn cmd_wizard(service: &WellnooshService, json: bool) -> Result<()> {
    let mut wizard = service.start_wizard()?;
    eprintln!("Let's update your goals. Type 'b' to go back, 'q' to quit.");

    while wizard.outcome().is_none() {
        show_step(&wizard);
        let line = prompt_line("> ")?;
        if line.eq_ignore_ascii_case("q") {
            bail!("Wizard cancelled; nothing was saved");
        }
        if let Err(e) = handle_line(&mut wizard, &line) {
            eprintln!("{e:#}");
        }
    }

    let Some(outcome) = wizard.outcome() else {
        bail!("Wizard ended without a result");
    };
    let done = service.complete_wizard(outcome).await?;
    if json {
        print_json(&done)?;
    } else {
        print_completion(&done);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wellnoosh_core::planner::MealsPerDay;
    use wellnoosh_core::profile::{ActivityLevel, DietStyle, HealthGoal, HealthProfile};

    fn run(wizard: &mut Wizard, lines: &[&str]) {
        for line in lines {
            handle_line(wizard, line).unwrap();
        }
    }

    #[test]
    fn test_scripted_walkthrough() {
        let mut wizard = Wizard::new(HealthProfile::default());
        run(
            &mut wizard,
            &["1", "", "3", "4", "", "82kg", "76", "1", "2", "3"],
        );
        let outcome = wizard.outcome().unwrap();
        assert!(outcome.profile.has_goal(HealthGoal::LoseWeight));
        assert_eq!(outcome.profile.activity_level, ActivityLevel::ModeratelyActive);
        assert!(outcome.profile.diet_styles.contains(&DietStyle::Vegan));
        assert_eq!(outcome.profile.weight_kg, 82.0);
        assert_eq!(outcome.profile.weight_goal_kg, Some(76.0));
        assert_eq!(outcome.answers.meals_per_day, MealsPerDay::Three);
    }

    #[test]
    fn test_continue_blocked_without_goal() {
        let mut wizard = Wizard::new(HealthProfile::default());
        assert!(handle_line(&mut wizard, "").is_err());
        assert!(matches!(
            wizard.state(),
            WizardState::GoalReassessment(ReassessmentStep::HealthGoals)
        ));
    }

    #[test]
    fn test_back_returns_to_previous_step() {
        let mut wizard = Wizard::new(HealthProfile::default());
        run(&mut wizard, &["1", ""]);
        assert_eq!(wizard.progress().0, 1);
        run(&mut wizard, &["b"]);
        assert_eq!(wizard.progress().0, 0);
    }

    #[test]
    fn test_goal_weight_must_match_goal() {
        let mut wizard = Wizard::new(HealthProfile::default());
        run(&mut wizard, &["1", "", "", "4", "", "80"]);
        let err = handle_line(&mut wizard, "85").unwrap_err();
        assert!(err.to_string().contains("lower than your current weight"));
        assert!(matches!(wizard.state(), WizardState::WeightGoal));
    }

    #[test]
    fn test_out_of_range_choice_rejected() {
        let mut wizard = Wizard::new(HealthProfile::default());
        assert!(handle_line(&mut wizard, "99").is_err());
    }
}
