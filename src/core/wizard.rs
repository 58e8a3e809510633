use super::recommend::suggest;
use super::types::{
    Instrument, InvestmentRange, RenderIntent, Step, WizardAction, WizardError, WizardState,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: WizardState,
    pub intent: RenderIntent,
}

impl WizardState {
    /// Applies one user action and returns the next state with what to show.
    ///
    /// On `Err` nothing changed; callers keep `self`.
    pub fn apply(
        self,
        action: WizardAction,
        catalog: &[Instrument],
    ) -> Result<Transition, WizardError> {
        match (self.step, action) {
            (_, WizardAction::Reset) => Ok(self.reset()),
            (Step::CollectIncome, WizardAction::SubmitIncome(income)) => {
                self.submit_income(income)
            }
            (Step::CollectExpenses, WizardAction::SubmitExpenses(expenses)) => {
                self.submit_expenses(expenses)
            }
            (Step::ReviewSavings, WizardAction::Analyze) => self.analyze(catalog),
            (step, action) => Err(WizardError::UnexpectedAction { step, action }),
        }
    }

    pub fn submit_income(self, income: f64) -> Result<Transition, WizardError> {
        self.expect_step(Step::CollectIncome, WizardAction::SubmitIncome(income))?;
        if !income.is_finite() || income <= 0.0 {
            return Err(WizardError::InvalidIncome { income });
        }

        Ok(Transition {
            state: WizardState {
                step: Step::CollectExpenses,
                income: Some(income),
                ..WizardState::default()
            },
            intent: RenderIntent::AskExpenses,
        })
    }

    pub fn submit_expenses(self, expenses: f64) -> Result<Transition, WizardError> {
        let action = WizardAction::SubmitExpenses(expenses);
        self.expect_step(Step::CollectExpenses, action)?;
        let Some(income) = self.income else {
            return Err(WizardError::UnexpectedAction {
                step: self.step,
                action,
            });
        };
        if !expenses.is_finite() || expenses < 0.0 {
            return Err(WizardError::InvalidExpenses { expenses });
        }

        let savings = income - expenses;
        let mut state = WizardState {
            step: Step::ReviewSavings,
            income: Some(income),
            expenses: Some(expenses),
            savings: Some(savings),
            investable_amount: None,
        };

        if savings <= 0.0 {
            return Ok(Transition {
                state,
                intent: RenderIntent::NoSavings { savings },
            });
        }

        let range = InvestmentRange::from_savings(savings);
        state.investable_amount = Some(range.max);
        Ok(Transition {
            state,
            intent: RenderIntent::SavingsSummary { savings, range },
        })
    }

    pub fn analyze(self, catalog: &[Instrument]) -> Result<Transition, WizardError> {
        self.expect_step(Step::ReviewSavings, WizardAction::Analyze)?;
        let savings = self.savings.unwrap_or(0.0);
        let Some(investable_amount) = self.investable_amount.filter(|_| savings > 0.0) else {
            return Err(WizardError::NoSavings { savings });
        };

        let picks = suggest(catalog, investable_amount);
        let intent = if picks.is_empty() {
            RenderIntent::NoAffordableInstruments { investable_amount }
        } else {
            RenderIntent::Shortlist {
                investable_amount,
                picks,
            }
        };

        Ok(Transition {
            state: WizardState {
                step: Step::ShowRecommendations,
                ..self
            },
            intent,
        })
    }

    /// Clears every answer and returns to the first question. Allowed from any step.
    pub fn reset(self) -> Transition {
        Transition {
            state: WizardState::default(),
            intent: RenderIntent::AskIncome,
        }
    }

    /// What to show for the current step without taking an action.
    ///
    /// `ShowRecommendations` has no prompt of its own, so it re-renders the
    /// savings summary; front ends keep the shortlist intent from the transition.
    pub fn intent(&self) -> RenderIntent {
        match self.step {
            Step::CollectIncome => RenderIntent::AskIncome,
            Step::CollectExpenses => RenderIntent::AskExpenses,
            Step::ReviewSavings | Step::ShowRecommendations => {
                let savings = self.savings.unwrap_or(0.0);
                if savings > 0.0 {
                    RenderIntent::SavingsSummary {
                        savings,
                        range: InvestmentRange::from_savings(savings),
                    }
                } else {
                    RenderIntent::NoSavings { savings }
                }
            }
        }
    }

    fn expect_step(&self, step: Step, action: WizardAction) -> Result<(), WizardError> {
        if self.step == step {
            Ok(())
        } else {
            Err(WizardError::UnexpectedAction {
                step: self.step,
                action,
            })
        }
    }
}
