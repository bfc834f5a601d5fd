mod actors;
mod clients;
mod domain;
mod error;
mod messages;
mod session;
mod stats;
mod store;
mod system;

#[cfg(test)]
mod mock_framework;

use tracing::{info, Instrument};

use crate::domain::Outcome;
use crate::session::Session;
use crate::system::{setup_tracing, RatingSystem};

#[tokio::main]
async fn main() -> Result<(), String> {
    // Setup tracing once for the entire application
    setup_tracing();

    info!("Starting community rating system");

    let system = RatingSystem::new();

    let admin = system
        .membership
        .ensure_admin("Boss".to_string(), "change-me".to_string())
        .await
        .map_err(|e| e.to_string())?;

    // Onboard members: signups, then admin review of the pending list.
    let span = tracing::info_span!("member_onboarding");
    let member = async {
        info!("Submitting signup requests");
        system
            .membership
            .signup("Kim".to_string(), "kim1".to_string(), "pw".to_string())
            .await
            .map_err(|e| e.to_string())?;
        system
            .membership
            .signup("Lee".to_string(), "lee9".to_string(), "pw".to_string())
            .await
            .map_err(|e| e.to_string())?;

        let mut admin_session = Session::new();
        admin_session.sign_in(admin.clone());
        admin_session.require_admin().map_err(|e| e.to_string())?;

        let pending = system
            .membership
            .list_pending()
            .await
            .map_err(|e| e.to_string())?;
        info!(count = pending.len(), "Pending signups awaiting review");

        info!("Rejecting one signup, approving the other");
        system
            .membership
            .reject("lee9".to_string())
            .await
            .map_err(|e| e.to_string())?;
        system
            .membership
            .approve("kim1".to_string())
            .await
            .map_err(|e| e.to_string())
    }
    .instrument(span)
    .await?;

    info!(member = %member.name, "Member approved");

    let mut session = Session::new();
    let user = system
        .membership
        .login("kim1".to_string(), "pw".to_string())
        .await
        .map_err(|e| e.to_string())?;
    session.sign_in(user);

    // Submit a few evaluations as the signed-in member.
    let evaluator = session
        .require_user()
        .map_err(|e| e.to_string())?
        .name
        .clone();
    let submissions = [
        (Outcome::Hit, None),
        (Outcome::HomeRun, Some("subway transfer bit".to_string())),
        (Outcome::Out, None),
    ];
    for (result, memo) in submissions {
        system
            .recorder
            .submit(evaluator.clone(), result, memo)
            .await
            .map_err(|e| e.to_string())?;
    }

    let records = system
        .recorder
        .list_records()
        .await
        .map_err(|e| e.to_string())?;
    match stats::stat_line(&records) {
        Some(line) => info!(
            total = line.total,
            hits = line.hits,
            home_runs = line.home_runs,
            average = line.batting_average,
            home_run_rate = line.home_run_rate,
            "Statistics"
        ),
        None => info!("No evaluations recorded yet"),
    }

    let rank = stats::daily_rank(&records, &stats::today());
    if rank.is_empty() {
        info!("No activity today");
    } else {
        for row in &rank {
            info!(evaluator = %row.evaluator, count = row.count, badge = ?row.badge, "Daily rank");
        }
    }

    let members = system
        .membership
        .list_members()
        .await
        .map_err(|e| e.to_string())?;
    for level in stats::member_levels(&members, &records) {
        info!(member = %level.name, tier = %level.tier, count = level.count, "Member level");
    }

    if let Some(user) = session.current() {
        info!(user = %user.name, "Signing out");
    }
    session.sign_out();

    // Admin tools: wipe the record set.
    let mut admin_session = Session::new();
    admin_session.sign_in(admin);
    if admin_session.is_admin() {
        system.recorder.reset_all().await.map_err(|e| e.to_string())?;
    }

    system.shutdown().await?;

    info!("Application completed successfully");
    Ok(())
}
