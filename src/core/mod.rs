mod recommend;
mod types;
mod wizard;

pub use recommend::suggest;
pub use types::{
    CURRENCY_SYMBOL, Instrument, InvestmentRange, MAX_INVEST_RATE, MIN_INVEST_RATE,
    RenderIntent, SHORTLIST_LEN, Step, WizardAction, WizardError, WizardState,
};
pub use wizard::Transition;
