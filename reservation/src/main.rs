//! Headless walk through the reservation wizard.
//!
//! Books a table for a sample guest, step by step, against the restaurant API
//! (or the in-memory demo backend with `MAISON_OFFLINE=1`) and prints the
//! progress stepper after every step.

use anyhow::{Context, bail};
use maison_core::environment::SystemClock;
use maison_reservation::api::http::HttpApiClient;
use maison_reservation::api::mock::MockRestaurantApi;
use maison_reservation::steps::customer_info::CustomerInfoAction;
use maison_reservation::steps::deposit::DepositAction;
use maison_reservation::steps::event_selection::EventSelectionAction;
use maison_reservation::steps::preorder::PreOrderAction;
use maison_reservation::steps::table_selection::{self, TableSelectionAction};
use maison_reservation::steps::time_selection::TimeSelectionAction;
use maison_reservation::{
    Config, CustomerProfile, CustomerTier, LoggingNavigator, PaymentMethod, ReservationWizard,
    WizardAction, WizardEnvironment, WizardSettings, WizardState, WizardStep, stepper,
};
use maison_runtime::Store;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type WizardStore = Store<WizardState, WizardAction, WizardEnvironment, ReservationWizard>;

const RESPONSE_TIMEOUT: Duration = Duration::from_secs(35);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    config.validate().context("invalid configuration")?;
    info!(
        api_url = %config.api.base_url,
        offline = config.offline,
        utc_offset = %config.wizard.utc_offset(),
        "Configuration loaded"
    );

    let clock = Arc::new(SystemClock);
    let navigator = Arc::new(LoggingNavigator);
    let settings = WizardSettings::from(&config.wizard);
    let environment = if config.offline {
        WizardEnvironment::new(&Arc::new(MockRestaurantApi::demo()), clock, navigator, settings)
    } else {
        let client = HttpApiClient::new(&config.api).context("failed to build the API client")?;
        WizardEnvironment::new(&Arc::new(client), clock, navigator, settings)
    };

    let store = Store::new(WizardState::default(), ReservationWizard::new(), environment.clone());
    let outcome = book_sample_table(&store, &environment).await;

    store
        .shutdown(environment.settings.payment_redirect_delay + Duration::from_secs(5))
        .await
        .context("effects still running at shutdown")?;
    outcome
}

async fn book_sample_table(store: &WizardStore, env: &WizardEnvironment) -> anyhow::Result<()> {
    store
        .send(WizardAction::StartSession {
            customer: CustomerProfile {
                full_name: "Nguyễn Văn An".into(),
                phone: "0901234567".into(),
                email: "an.nguyen@example.vn".into(),
                tier: CustomerTier::Regular,
            },
        })
        .await?;
    for action in [
        CustomerInfoAction::SetNumPeople(4),
        CustomerInfoAction::SetDuration(60),
        CustomerInfoAction::SetSpecialRequests("Bàn gần cửa sổ".into()),
    ] {
        store.send(WizardAction::CustomerInfo(action)).await?;
    }
    advance(store, WizardStep::TimeSelection).await?;

    let tomorrow = env.today().succ_opt().context("no date after today")?;
    store
        .send(WizardAction::TimeSelection(TimeSelectionAction::SelectDate(tomorrow)))
        .await?;
    store
        .send(WizardAction::TimeSelection(TimeSelectionAction::SelectTime("19:00".into())))
        .await?;

    store
        .send_and_wait_for(
            WizardAction::Next,
            |action| {
                matches!(
                    action,
                    WizardAction::TableSelection(
                        TableSelectionAction::TablesLoaded { .. } | TableSelectionAction::TablesFailed { .. }
                    )
                )
            },
            RESPONSE_TIMEOUT,
        )
        .await?;
    print_progress(store).await;

    let table = store
        .state(|s| {
            let party = s.draft().num_people;
            table_selection::list_tables(&s.table_selection)
                .into_iter()
                .find(|table| table.is_available() && table.capacity >= party)
                .map(|table| (table.id.clone(), table.table_number.clone()))
        })
        .await;
    let Some((table_id, table_number)) = table else {
        bail!("no free table for this party");
    };
    info!(%table_id, %table_number, "Table chosen");
    store
        .send(WizardAction::TableSelection(TableSelectionAction::SelectTable(table_id)))
        .await?;

    store
        .send_and_wait_for(
            WizardAction::Next,
            |action| {
                matches!(
                    action,
                    WizardAction::EventSelection(
                        EventSelectionAction::EventsLoaded { .. } | EventSelectionAction::EventsFailed { .. }
                    )
                )
            },
            RESPONSE_TIMEOUT,
        )
        .await?;
    print_progress(store).await;
    store
        .send(WizardAction::EventSelection(EventSelectionAction::SelectEvent(None)))
        .await?;
    store
        .send_and_wait_for(
            WizardAction::Next,
            |action| {
                matches!(
                    action,
                    WizardAction::PreOrder(PreOrderAction::MenuLoaded { .. } | PreOrderAction::MenuFailed { .. })
                )
            },
            RESPONSE_TIMEOUT,
        )
        .await?;
    print_progress(store).await;

    let dish = store
        .state(|s| s.preorder.menu.value().and_then(|menu| menu.first()).map(|dish| dish.id.clone()))
        .await;
    match dish {
        Some(dish_id) => {
            for _ in 0..2 {
                store
                    .send(WizardAction::PreOrder(PreOrderAction::AddDish(dish_id.clone())))
                    .await?;
            }
            let subtotal = store.state(|s| s.draft().pre_order_total()).await;
            info!(%dish_id, %subtotal, "Dishes pre-ordered");
        },
        None => info!("Menu unavailable; booking without pre-order"),
    }
    advance(store, WizardStep::Deposit).await?;

    store
        .send(WizardAction::Deposit(DepositAction::SelectPaymentMethod(PaymentMethod::Vnpay)))
        .await?;
    let pricing = store.state(WizardState::pricing).await;
    info!(
        subtotal = %pricing.subtotal,
        total = %pricing.total,
        deposit = %pricing.deposit,
        "Ready to submit"
    );

    let outcome = store
        .send_and_wait_for(
            WizardAction::Submit,
            |action| {
                matches!(
                    action,
                    WizardAction::SubmissionSucceeded(_) | WizardAction::SubmissionFailed(_)
                )
            },
            RESPONSE_TIMEOUT,
        )
        .await?;
    print_progress(store).await;

    let (notice, redirect, reservation_id) = store
        .state(|s| {
            (
                s.notice().map(|notice| notice.message.clone()),
                s.payment_redirect().map(str::to_string),
                s.reservation_id().map(str::to_string),
            )
        })
        .await;
    if let Some(notice) = notice {
        println!("{notice}");
    }
    match outcome {
        WizardAction::SubmissionFailed(error) => bail!("reservation was not created: {error}"),
        _ if redirect.is_some() => info!(url = ?redirect, "Waiting for the payment redirect"),
        _ => info!(reservation_id = ?reservation_id, "Reservation confirmed"),
    }
    Ok(())
}

/// Sends `Next` and checks the wizard landed on `expected`
async fn advance(store: &WizardStore, expected: WizardStep) -> anyhow::Result<()> {
    store.send(WizardAction::Next).await?;
    let step = store.state(WizardState::current_step).await;
    print_progress(store).await;
    if step != expected {
        bail!("wizard stayed on step {step}; expected {expected}");
    }
    Ok(())
}

async fn print_progress(store: &WizardStore) {
    let step = store.state(WizardState::current_step).await;
    println!("{}", stepper::render(step));
}
