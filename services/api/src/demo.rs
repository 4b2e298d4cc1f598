use clap::Args;

use clearance_core::clearance::{RequestId, UserId};
use clearance_core::config::ClearanceConfig;
use clearance_core::error::AppError;

use crate::infra::{build_workflow, AppWorkflow, SAMPLE_RESIDENT, SAMPLE_TYPE};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Stated purpose for the sample request
    #[arg(long, default_value = "local employment requirement")]
    pub(crate) purpose: String,
    /// Reject the request at review instead of approving it
    #[arg(long)]
    pub(crate) reject: bool,
    /// Print the full audit trail at the end
    #[arg(long)]
    pub(crate) list_audit: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let workflow = build_workflow(ClearanceConfig::default());
    let clerk = UserId::new("desk.clerk");

    println!("Clearance lifecycle demo");
    println!("Resident {} applies: \"{}\"", SAMPLE_RESIDENT.0, args.purpose);

    let request = workflow.create(SAMPLE_RESIDENT, SAMPLE_TYPE, args.purpose)?;
    println!(
        "- Submitted as {} (status {})",
        request.reference_number,
        request.status.label()
    );

    if args.reject {
        let rejected = workflow.process(
            request.id,
            false,
            Some("supporting documents incomplete".to_string()),
            &clerk,
        )?;
        println!(
            "- Rejected by {}: {}",
            clerk.0,
            rejected.remarks.as_deref().unwrap_or("no remarks")
        );
        print_trail(&workflow, request.id, args.list_audit)?;
        return Ok(());
    }

    let approved = workflow.process(
        request.id,
        true,
        Some("records verified".to_string()),
        &clerk,
    )?;
    println!("- Approved by {} (status {})", clerk.0, approved.status.label());

    if !workflow.record_payment(request.id, &clerk, Some("OR-DEMO-0001".to_string()))? {
        println!("- Payment refused; see the service log for the reason");
        return Ok(());
    }
    println!("- Payment recorded, queued for release");

    if !workflow.mark_released(request.id, &clerk)? {
        println!("- Release refused; see the service log for the reason");
        return Ok(());
    }

    let released = workflow.get(request.id)?;
    println!(
        "- Released; valid until {}",
        released
            .expiry_date
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    );
    if let Some(path) = &released.document_path {
        println!("- Document issued at {path}");
    }

    match serde_json::to_string_pretty(&released.status_view()) {
        Ok(json) => println!("\nPublic status payload:\n{json}"),
        Err(err) => println!("\nPublic status payload unavailable: {err}"),
    }

    print_trail(&workflow, request.id, args.list_audit)?;
    Ok(())
}

fn print_trail(workflow: &AppWorkflow, request_id: RequestId, full: bool) -> Result<(), AppError> {
    let history = workflow
        .audit()
        .for_entity("ClearanceRequest", &request_id.to_string())
        .map_err(|err| AppError::Io(std::io::Error::other(err.to_string())))?;

    println!("\nAudit trail ({} entries, newest first)", history.len());
    for entry in &history {
        let actor = entry
            .actor_user_id
            .as_ref()
            .map(|user| user.0.as_str())
            .unwrap_or("system");
        println!(
            "- #{} {} by {} at {}",
            entry.id,
            entry.action.label(),
            actor,
            entry.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
        if full {
            if let Some(details) = &entry.details {
                println!("    details: {details}");
            }
            if let Some(new_values) = &entry.new_values {
                println!("    new values: {new_values}");
            }
        }
    }
    Ok(())
}
