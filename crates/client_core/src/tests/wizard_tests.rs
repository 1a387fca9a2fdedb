use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use shared::domain::CampaignStatus;

use super::*;
use crate::test_support::campaign;

fn fill_details(wizard: &mut WizardController) {
    wizard.set_text(CampaignField::Name, "Spring whitening");
    wizard.set_text(CampaignField::Objective, "leads");
    wizard.set_text(CampaignField::Audience, "all");
    wizard.set_text(CampaignField::StartDate, "2024-01-01");
    wizard.set_text(CampaignField::EndDate, "2024-01-10");
}

fn social_wizard_at_schedule() -> WizardController {
    let mut wizard = WizardController::new(CampaignKind::Social);
    fill_details(&mut wizard);
    assert_eq!(wizard.advance(), AdvanceOutcome::Advanced(WizardStep::Content));
    wizard.set_platforms(&[Platform::Facebook, Platform::Instagram]);
    wizard.set_text(CampaignField::Mode, "organic");
    assert_eq!(wizard.advance(), AdvanceOutcome::Advanced(WizardStep::Schedule));
    wizard
}

#[test]
fn empty_name_blocks_details_and_marks_it_touched() {
    let mut wizard = WizardController::new(CampaignKind::Social);
    fill_details(&mut wizard);
    wizard.set_text(CampaignField::Name, "");

    let outcome = wizard.advance();

    assert_eq!(
        outcome,
        AdvanceOutcome::Blocked {
            missing: vec![CampaignField::Name]
        }
    );
    assert_eq!(wizard.current_step(), WizardStep::Details);
    assert!(wizard.is_touched(CampaignField::Name));
    assert!(wizard.step_submitted());
    assert_eq!(
        wizard.field_error(CampaignField::Name).as_deref(),
        Some("Campaign name is required")
    );
    assert_eq!(wizard.field_error(CampaignField::Objective), None);
}

#[test]
fn details_step_requires_every_field() {
    let required = [
        CampaignField::Name,
        CampaignField::Objective,
        CampaignField::Audience,
        CampaignField::StartDate,
        CampaignField::EndDate,
    ];
    for missing in required {
        let mut wizard = WizardController::new(CampaignKind::Email);
        fill_details(&mut wizard);
        wizard.set_text(missing, "   ");
        assert!(matches!(wizard.advance(), AdvanceOutcome::Blocked { .. }));
        assert_eq!(wizard.current_step(), WizardStep::Details, "{missing:?}");
    }
}

#[test]
fn social_content_never_advances_without_platforms() {
    let mut wizard = WizardController::new(CampaignKind::Social);
    fill_details(&mut wizard);
    wizard.advance();
    wizard.set_text(CampaignField::Mode, "organic");

    assert_eq!(
        wizard.advance(),
        AdvanceOutcome::Blocked {
            missing: vec![CampaignField::Platforms]
        }
    );

    wizard.toggle_platform(Platform::Linkedin);
    wizard.toggle_platform(Platform::Linkedin);
    assert!(matches!(wizard.advance(), AdvanceOutcome::Blocked { .. }));
    assert_eq!(
        wizard.field_error(CampaignField::Platforms).as_deref(),
        Some("Select at least one platform")
    );

    wizard.toggle_platform(Platform::Linkedin);
    assert_eq!(wizard.advance(), AdvanceOutcome::Advanced(WizardStep::Schedule));
}

#[test]
fn success_clears_step_submitted_flag() {
    let mut wizard = WizardController::new(CampaignKind::Social);
    wizard.advance();
    assert!(wizard.step_submitted());
    fill_details(&mut wizard);
    wizard.advance();
    assert!(!wizard.step_submitted());
}

#[test]
fn email_content_requires_subject_and_template() {
    let mut wizard = WizardController::new(CampaignKind::Email);
    fill_details(&mut wizard);
    wizard.advance();
    assert_eq!(
        wizard.advance(),
        AdvanceOutcome::Blocked {
            missing: vec![CampaignField::Subject, CampaignField::Template]
        }
    );
    wizard.set_text(CampaignField::Subject, "Checkup reminder");
    wizard.set_text(CampaignField::Template, "3");
    assert_eq!(wizard.advance(), AdvanceOutcome::Advanced(WizardStep::Schedule));
}

#[test]
fn going_back_does_not_revalidate_later_steps() {
    let mut wizard = social_wizard_at_schedule();
    assert_eq!(wizard.back(), WizardStep::Content);
    assert_eq!(wizard.back(), WizardStep::Details);
    assert_eq!(wizard.back(), WizardStep::Details);

    wizard.set_text(CampaignField::Name, "");
    assert_eq!(wizard.current_step(), WizardStep::Details);
    assert!(!wizard.is_touched(CampaignField::Name));
    assert!(matches!(wizard.advance(), AdvanceOutcome::Blocked { .. }));
}

#[test]
fn scheduling_later_requires_timestamp() {
    let mut wizard = social_wizard_at_schedule();
    wizard.set_schedule_mode(ScheduleMode::Later);
    assert_eq!(wizard.advance(), AdvanceOutcome::AtEnd);

    let err = wizard.begin_submit().expect_err("missing time");
    match err {
        WizardError::Incomplete { missing } => {
            assert_eq!(missing, vec![CampaignField::ScheduledAt])
        }
        other => panic!("unexpected error: {other:?}"),
    }

    wizard.set_text(CampaignField::ScheduledAt, "2024-01-02T09:30:00+02:00");
    let request = wizard.begin_submit().expect("request");
    assert_eq!(request.schedule_mode, ScheduleMode::Later);
    assert_eq!(
        request.scheduled_at.map(|ts| ts.to_rfc3339()),
        Some("2024-01-02T07:30:00+00:00".to_string())
    );
}

#[tokio::test]
async fn submit_from_earlier_step_is_a_noop() {
    let mut wizard = WizardController::new(CampaignKind::Social);
    fill_details(&mut wizard);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let err = wizard
        .submit(|_, _| async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(campaign(1, CampaignStatus::Draft))
        })
        .await
        .expect_err("not terminal");

    assert!(matches!(
        err,
        WizardError::NotAtTerminalStep {
            step: WizardStep::Details
        }
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(wizard.current_step(), WizardStep::Details);
    assert_eq!(wizard.submission(), SubmissionState::Idle);
}

#[tokio::test]
async fn submit_builds_payload_from_accumulated_fields() {
    let mut wizard = social_wizard_at_schedule();
    wizard.set_schedule_mode(ScheduleMode::Now);
    let key = wizard.idempotency_key();

    let created = wizard
        .submit(|request, idempotency_key| async move {
            assert_eq!(idempotency_key, key);
            assert_eq!(request.name, "Spring whitening");
            assert_eq!(
                request.content,
                CampaignContent::Social {
                    platforms: vec![Platform::Facebook, Platform::Instagram],
                    mode: "organic".into(),
                }
            );
            assert_eq!(request.start_date.to_string(), "2024-01-01");
            assert!(request.scheduled_at.is_none());
            Ok(campaign(42, CampaignStatus::Live))
        })
        .await
        .expect("submit");

    assert_eq!(created.id, CampaignId(42));
    assert_eq!(wizard.submission(), SubmissionState::Completed(CampaignId(42)));
    assert!(matches!(
        wizard.begin_submit(),
        Err(WizardError::AlreadySubmitted(CampaignId(42)))
    ));
}

#[test]
fn second_begin_while_in_flight_is_rejected() {
    let mut wizard = social_wizard_at_schedule();
    wizard.set_schedule_mode(ScheduleMode::Now);
    wizard.begin_submit().expect("first");
    assert!(matches!(
        wizard.begin_submit(),
        Err(WizardError::AlreadySubmitting)
    ));
}

#[tokio::test]
async fn failed_save_records_error_and_allows_retry_with_same_key() {
    let mut wizard = social_wizard_at_schedule();
    wizard.set_schedule_mode(ScheduleMode::Now);
    let key = wizard.idempotency_key();

    let err = wizard
        .submit(|_, _| async move { Err(ClientError::Validation("backend said no".into())) })
        .await
        .expect_err("save fails");
    assert!(matches!(err, WizardError::Save(_)));
    assert_eq!(wizard.submission(), SubmissionState::Idle);
    assert!(wizard.last_error().is_some());

    let retried = wizard
        .submit(|_, idempotency_key| async move {
            assert_eq!(idempotency_key, key);
            Ok(campaign(7, CampaignStatus::Schedule))
        })
        .await
        .expect("retry");
    assert_eq!(retried.id, CampaignId(7));
    assert_eq!(wizard.last_error(), None);
}

#[test]
fn unparsable_dates_fail_on_submit_with_field_error() {
    let mut wizard = WizardController::new(CampaignKind::Social);
    fill_details(&mut wizard);
    wizard.set_text(CampaignField::EndDate, "next friday");
    wizard.advance();
    wizard.set_platforms(&[Platform::Google]);
    wizard.set_text(CampaignField::Mode, "sponsored");
    wizard.advance();
    wizard.set_schedule_mode(ScheduleMode::Now);

    match wizard.begin_submit() {
        Err(WizardError::InvalidField { field, .. }) => assert_eq!(field, CampaignField::EndDate),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(wizard.last_error().is_some());
    assert_eq!(wizard.submission(), SubmissionState::Idle);
}

#[test]
fn end_before_start_is_rejected() {
    let mut wizard = social_wizard_at_schedule();
    wizard.set_text(CampaignField::EndDate, "2023-12-31");
    wizard.set_schedule_mode(ScheduleMode::Now);
    assert!(matches!(
        wizard.begin_submit(),
        Err(WizardError::InvalidField {
            field: CampaignField::EndDate,
            ..
        })
    ));
}
