//! Goal reassessment wizard.
//!
//! A linear flow: three reassessment steps, current weight, weight goal,
//! three questionnaire questions, then the generated plan. Only
//! [`WizardEvent::Next`] moves forward, and it refuses to while the current
//! step is incomplete or invalid.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::nutrition::{Assessment, WeightGoalError, assess, validate_weight_goal};
use crate::planner::MealsPerDay;
use crate::profile::{
    ActivityLevel, DietStyle, HealthGoal, HealthProfile, ProfileError, validate_weight_kg,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReassessmentStep {
    HealthGoals,
    ActivityLevel,
    DietStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Question {
    DailyActivity,
    MealsPerDay,
    StomachComfort,
}

impl Question {
    #[must_use]
    pub fn prompt(self) -> &'static str {
        match self {
            Self::DailyActivity => "How do you typically spend your day?",
            Self::MealsPerDay => "How many meals a day would you like to have?",
            Self::StomachComfort => "Do you experience stomach discomfort during the day?",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DailyActivity {
    #[serde(rename = "Sitting all day long at work")]
    SittingAtWork,
    #[serde(rename = "I'm always on my feet")]
    OnMyFeet,
    #[serde(rename = "Doing lots of physical activity")]
    PhysicallyActive,
    #[serde(rename = "Staying at home")]
    AtHome,
}

pub const DAILY_ACTIVITIES: &[DailyActivity] = &[
    DailyActivity::SittingAtWork,
    DailyActivity::OnMyFeet,
    DailyActivity::PhysicallyActive,
    DailyActivity::AtHome,
];

impl DailyActivity {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::SittingAtWork => "Sitting all day long at work",
            Self::OnMyFeet => "I'm always on my feet",
            Self::PhysicallyActive => "Doing lots of physical activity",
            Self::AtHome => "Staying at home",
        }
    }
}

impl fmt::Display for DailyActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StomachComfort {
    Yes,
    No,
    #[serde(rename = "I am not sure")]
    NotSure,
}

pub const STOMACH_COMFORT: &[StomachComfort] = &[
    StomachComfort::Yes,
    StomachComfort::No,
    StomachComfort::NotSure,
];

impl StomachComfort {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::No => "No",
            Self::NotSure => "I am not sure",
        }
    }
}

impl fmt::Display for StomachComfort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StomachComfort {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yes" | "y" => Ok(Self::Yes),
            "no" | "n" => Ok(Self::No),
            "i am not sure" | "not sure" | "unsure" => Ok(Self::NotSure),
            _ => Err(ProfileError::Unknown {
                kind: "answer",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "question", content = "answer", rename_all = "camelCase")]
pub enum QuestionnaireAnswer {
    DailyActivity(DailyActivity),
    MealsPerDay(MealsPerDay),
    StomachComfort(StomachComfort),
}

impl QuestionnaireAnswer {
    #[must_use]
    pub fn question(self) -> Question {
        match self {
            Self::DailyActivity(_) => Question::DailyActivity,
            Self::MealsPerDay(_) => Question::MealsPerDay,
            Self::StomachComfort(_) => Question::StomachComfort,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PendingAnswers {
    daily_activity: Option<DailyActivity>,
    meals_per_day: Option<MealsPerDay>,
    stomach_comfort: Option<StomachComfort>,
}

impl PendingAnswers {
    fn has(&self, question: Question) -> bool {
        match question {
            Question::DailyActivity => self.daily_activity.is_some(),
            Question::MealsPerDay => self.meals_per_day.is_some(),
            Question::StomachComfort => self.stomach_comfort.is_some(),
        }
    }

    fn record(&mut self, answer: QuestionnaireAnswer) {
        match answer {
            QuestionnaireAnswer::DailyActivity(a) => self.daily_activity = Some(a),
            QuestionnaireAnswer::MealsPerDay(m) => self.meals_per_day = Some(m),
            QuestionnaireAnswer::StomachComfort(s) => self.stomach_comfort = Some(s),
        }
    }

    fn complete(self) -> Option<QuestionnaireAnswers> {
        Some(QuestionnaireAnswers {
            daily_activity: self.daily_activity?,
            meals_per_day: self.meals_per_day?,
            stomach_comfort: self.stomach_comfort?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireAnswers {
    pub daily_activity: DailyActivity,
    pub meals_per_day: MealsPerDay,
    pub stomach_comfort: StomachComfort,
}

/// Everything the finished wizard hands back to the profile store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardOutcome {
    pub daily_calories: i64,
    pub bmi: f64,
    pub bmi_feedback: String,
    pub assessment: Assessment,
    pub answers: QuestionnaireAnswers,
    pub profile: HealthProfile,
}

impl WizardOutcome {
    fn assessed(profile: HealthProfile, answers: QuestionnaireAnswers) -> Self {
        let assessment = assess(&profile);
        Self {
            daily_calories: assessment.target.calories,
            bmi: assessment.bmi,
            bmi_feedback: assessment.bmi_feedback.clone(),
            assessment,
            answers,
            profile,
        }
    }

    /// Finish the wizard in one step from already-collected inputs, applying
    /// the same checks the step-by-step flow does.
    pub fn from_inputs(
        profile: HealthProfile,
        answers: QuestionnaireAnswers,
    ) -> Result<Self, WizardError> {
        if profile.health_goals.is_empty() || profile.diet_styles.is_empty() {
            return Err(WizardError::NothingSelected);
        }
        profile.validate()?;
        if let Some(goal) = profile.weight_goal_kg {
            validate_weight_goal(profile.weight_kg, goal, &profile.health_goals)?;
        }
        Ok(Self::assessed(profile, answers))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WizardState {
    GoalReassessment(ReassessmentStep),
    WeightUpdate,
    WeightGoal,
    Questionnaire(Question),
    MealPlanGenerated(Box<WizardOutcome>),
}

impl WizardState {
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::MealPlanGenerated(_))
    }

    fn index(&self) -> usize {
        match self {
            Self::GoalReassessment(ReassessmentStep::HealthGoals) => 0,
            Self::GoalReassessment(ReassessmentStep::ActivityLevel) => 1,
            Self::GoalReassessment(ReassessmentStep::DietStyle) => 2,
            Self::WeightUpdate => 3,
            Self::WeightGoal => 4,
            Self::Questionnaire(Question::DailyActivity) => 5,
            Self::Questionnaire(Question::MealsPerDay) => 6,
            Self::Questionnaire(Question::StomachComfort) => 7,
            Self::MealPlanGenerated(_) => STEP_COUNT,
        }
    }
}

/// Number of input steps before the plan is generated.
pub const STEP_COUNT: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub enum WizardEvent {
    ToggleGoal(HealthGoal),
    SelectActivity(ActivityLevel),
    ToggleDietStyle(DietStyle),
    SetCurrentWeight(f64),
    SetGoalWeight(f64),
    Answer(QuestionnaireAnswer),
    Next,
    Back,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WizardError {
    #[error("Select at least one option to continue")]
    NothingSelected,
    #[error("Answer the question to continue")]
    Unanswered,
    #[error(transparent)]
    Weight(#[from] ProfileError),
    #[error(transparent)]
    WeightGoal(#[from] WeightGoalError),
    #[error("That input does not belong to the current step")]
    WrongStep,
    #[error("The wizard has already finished")]
    Finished,
}

#[derive(Debug, Clone)]
pub struct Wizard {
    state: WizardState,
    profile: HealthProfile,
    goal_weight_kg: f64,
    answers: PendingAnswers,
}

impl Wizard {
    /// Start at the first reassessment step with `profile`'s selections preloaded.
    #[must_use]
    pub fn new(profile: HealthProfile) -> Self {
        let goal_weight_kg = profile.weight_goal_kg.unwrap_or(profile.weight_kg);
        Self {
            state: WizardState::GoalReassessment(ReassessmentStep::HealthGoals),
            profile,
            goal_weight_kg,
            answers: PendingAnswers::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> &WizardState {
        &self.state
    }

    #[must_use]
    pub fn profile(&self) -> &HealthProfile {
        &self.profile
    }

    #[must_use]
    pub fn goal_weight_kg(&self) -> f64 {
        self.goal_weight_kg
    }

    /// `(current step, total steps)`; the finished state reports `(8, 8)`.
    #[must_use]
    pub fn progress(&self) -> (usize, usize) {
        (self.state.index(), STEP_COUNT)
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&WizardOutcome> {
        match &self.state {
            WizardState::MealPlanGenerated(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn apply(&mut self, event: WizardEvent) -> Result<&WizardState, WizardError> {
        if self.state.is_finished() {
            return Err(WizardError::Finished);
        }
        match event {
            WizardEvent::Next => self.next()?,
            WizardEvent::Back => self.back(),
            input => self.input(input)?,
        }
        Ok(&self.state)
    }

    fn input(&mut self, event: WizardEvent) -> Result<(), WizardError> {
        match (&self.state, event) {
            (
                WizardState::GoalReassessment(ReassessmentStep::HealthGoals),
                WizardEvent::ToggleGoal(goal),
            ) => {
                if !self.profile.health_goals.remove(&goal) {
                    self.profile.health_goals.insert(goal);
                }
            }
            (
                WizardState::GoalReassessment(ReassessmentStep::ActivityLevel),
                WizardEvent::SelectActivity(level),
            ) => self.profile.activity_level = level,
            (
                WizardState::GoalReassessment(ReassessmentStep::DietStyle),
                WizardEvent::ToggleDietStyle(style),
            ) => {
                if !self.profile.diet_styles.remove(&style) {
                    self.profile.diet_styles.insert(style);
                }
            }
            (WizardState::WeightUpdate, WizardEvent::SetCurrentWeight(kg)) => {
                self.profile.weight_kg = kg;
            }
            (WizardState::WeightGoal, WizardEvent::SetGoalWeight(kg)) => {
                self.goal_weight_kg = kg;
            }
            (WizardState::Questionnaire(question), WizardEvent::Answer(answer))
                if answer.question() == *question =>
            {
                self.answers.record(answer);
            }
            _ => return Err(WizardError::WrongStep),
        }
        Ok(())
    }

    fn next(&mut self) -> Result<(), WizardError> {
        let next = match &self.state {
            WizardState::GoalReassessment(ReassessmentStep::HealthGoals) => {
                if self.profile.health_goals.is_empty() {
                    return Err(WizardError::NothingSelected);
                }
                WizardState::GoalReassessment(ReassessmentStep::ActivityLevel)
            }
            WizardState::GoalReassessment(ReassessmentStep::ActivityLevel) => {
                WizardState::GoalReassessment(ReassessmentStep::DietStyle)
            }
            WizardState::GoalReassessment(ReassessmentStep::DietStyle) => {
                if self.profile.diet_styles.is_empty() {
                    return Err(WizardError::NothingSelected);
                }
                WizardState::WeightUpdate
            }
            WizardState::WeightUpdate => {
                validate_weight_kg(self.profile.weight_kg)?;
                WizardState::WeightGoal
            }
            WizardState::WeightGoal => {
                validate_weight_goal(
                    self.profile.weight_kg,
                    self.goal_weight_kg,
                    &self.profile.health_goals,
                )?;
                self.profile.weight_goal_kg = Some(self.goal_weight_kg);
                WizardState::Questionnaire(Question::DailyActivity)
            }
            WizardState::Questionnaire(question) => {
                if !self.answers.has(*question) {
                    return Err(WizardError::Unanswered);
                }
                match question {
                    Question::DailyActivity => WizardState::Questionnaire(Question::MealsPerDay),
                    Question::MealsPerDay => WizardState::Questionnaire(Question::StomachComfort),
                    Question::StomachComfort => self.finish()?,
                }
            }
            WizardState::MealPlanGenerated(_) => return Err(WizardError::Finished),
        };
        self.state = next;
        Ok(())
    }

    fn finish(&self) -> Result<WizardState, WizardError> {
        let answers = self.answers.complete().ok_or(WizardError::Unanswered)?;
        Ok(WizardState::MealPlanGenerated(Box::new(
            WizardOutcome::assessed(self.profile.clone(), answers),
        )))
    }

    fn back(&mut self) {
        self.state = match &self.state {
            WizardState::GoalReassessment(ReassessmentStep::HealthGoals) => return,
            WizardState::GoalReassessment(ReassessmentStep::ActivityLevel) => {
                WizardState::GoalReassessment(ReassessmentStep::HealthGoals)
            }
            WizardState::GoalReassessment(ReassessmentStep::DietStyle) => {
                WizardState::GoalReassessment(ReassessmentStep::ActivityLevel)
            }
            WizardState::WeightUpdate => {
                WizardState::GoalReassessment(ReassessmentStep::DietStyle)
            }
            WizardState::WeightGoal => WizardState::WeightUpdate,
            WizardState::Questionnaire(Question::DailyActivity) => WizardState::WeightGoal,
            WizardState::Questionnaire(Question::MealsPerDay) => {
                WizardState::Questionnaire(Question::DailyActivity)
            }
            WizardState::Questionnaire(Question::StomachComfort) => {
                WizardState::Questionnaire(Question::MealsPerDay)
            }
            WizardState::MealPlanGenerated(_) => return,
        };
    }
}
