use serde::Serialize;
use thiserror::Error;

pub const MIN_INVEST_RATE: f64 = 0.05;
pub const MAX_INVEST_RATE: f64 = 0.10;
pub const SHORTLIST_LEN: usize = 3;
pub const CURRENCY_SYMBOL: &str = "₹";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    pub company: String,
    pub ticker: String,
    pub price: f64,
    /// Percent, e.g. `8.0` for 8%.
    pub monthly_growth: f64,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    #[default]
    CollectIncome,
    CollectExpenses,
    ReviewSavings,
    ShowRecommendations,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum WizardAction {
    SubmitIncome(f64),
    SubmitExpenses(f64),
    Analyze,
    Reset,
}

/// Accumulated answers for one session.
///
/// Later fields are only populated once the step producing them has completed;
/// `investable_amount` additionally requires positive savings.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardState {
    pub step: Step,
    pub income: Option<f64>,
    pub expenses: Option<f64>,
    pub savings: Option<f64>,
    pub investable_amount: Option<f64>,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct InvestmentRange {
    pub min: f64,
    pub max: f64,
}

impl InvestmentRange {
    pub fn from_savings(savings: f64) -> Self {
        Self {
            min: savings * MIN_INVEST_RATE,
            max: savings * MAX_INVEST_RATE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "kind",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum RenderIntent {
    AskIncome,
    AskExpenses,
    SavingsSummary {
        savings: f64,
        range: InvestmentRange,
    },
    NoSavings {
        savings: f64,
    },
    Shortlist {
        investable_amount: f64,
        picks: Vec<Instrument>,
    },
    NoAffordableInstruments {
        investable_amount: f64,
    },
}

impl RenderIntent {
    /// Default wording for text front ends.
    pub fn message(&self) -> String {
        match self {
            RenderIntent::AskIncome => "Hi! What's your monthly income?".to_string(),
            RenderIntent::AskExpenses => "And what are your total monthly expenses?".to_string(),
            RenderIntent::SavingsSummary { savings, range } => format!(
                "Great! You are saving {CURRENCY_SYMBOL}{savings}/month. \
                 You can invest between {CURRENCY_SYMBOL}{} and {CURRENCY_SYMBOL}{} per month.",
                range.min.trunc(),
                range.max.trunc()
            ),
            RenderIntent::NoSavings { .. } => {
                "Oops! Your expenses exceed or equal your income. No savings to invest.".to_string()
            }
            RenderIntent::Shortlist { picks, .. } => {
                let mut out = String::from("Suggested stocks:");
                for pick in picks {
                    out.push_str(&format!(
                        "\n- {} ({}) {CURRENCY_SYMBOL}{} | {}% growth",
                        pick.company, pick.ticker, pick.price, pick.monthly_growth
                    ));
                }
                out
            }
            RenderIntent::NoAffordableInstruments { .. } => {
                "No stocks found under your investable amount. Try saving more!".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WizardError {
    #[error("monthly income must be greater than 0, got {income}")]
    InvalidIncome { income: f64 },
    #[error("monthly expenses cannot be negative, got {expenses}")]
    InvalidExpenses { expenses: f64 },
    #[error("no savings to invest: income minus expenses is {savings}")]
    NoSavings { savings: f64 },
    #[error("{action:?} is not accepted while in step {step:?}")]
    UnexpectedAction { step: Step, action: WizardAction },
}

impl WizardError {
    pub fn code(&self) -> &'static str {
        match self {
            WizardError::InvalidIncome { .. } => "invalid-income",
            WizardError::InvalidExpenses { .. } => "invalid-expenses",
            WizardError::NoSavings { .. } => "no-savings",
            WizardError::UnexpectedAction { .. } => "unexpected-action",
        }
    }
}
