//! Drops the enrollments of students announced on the `student.dropped` topic.

use std::sync::Arc;

use futures::{TryStreamExt, stream};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use schoolbill_core::{Error, JobId, StudentId};
use schoolbill_events::{Message, Subscriber};
use schoolbill_schools::ActiveEnrollmentProjection;

use super::executor::JobExecutor;
use super::model::{JobExecutionResult, JobItemResult};
use crate::id_generator::IdGenerator;
use crate::repository::{EnrollmentRepository, EnrollmentsQuery, active_enrollments, technical};
use crate::use_cases::{DROP_STUDENT_TOPIC, DropEnrollment, DropEnrollmentRequest, StudentDropped};

pub const DROP_STUDENT_ENROLLMENTS_JOB: &str = "DropStudentEnrollments";

/// Soft deletes every active enrollment of one student, isolating failures
/// per enrollment.
pub struct DropStudentEnrollments {
    enrollments: Arc<dyn EnrollmentRepository>,
    drop_enrollment: Arc<DropEnrollment>,
    executor: JobExecutor,
    ids: Arc<dyn IdGenerator>,
}

impl DropStudentEnrollments {
    pub fn new(
        enrollments: Arc<dyn EnrollmentRepository>,
        drop_enrollment: Arc<DropEnrollment>,
        executor: JobExecutor,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            enrollments,
            drop_enrollment,
            executor,
            ids,
        }
    }

    pub async fn execute(&self, student_id: StudentId) -> Result<JobExecutionResult, Error> {
        info!(student_id = %student_id, "About to drop student enrollments");

        let job_id = JobId::from_uuid(self.ids.generate().await);
        let drop_enrollment = self.drop_enrollment.clone();

        let items = active_enrollments(
            self.enrollments.clone(),
            EnrollmentsQuery::ByStudentId(student_id),
        )
        .map_ok(|page| stream::iter(page.into_iter().map(Ok::<_, Error>)))
        .try_flatten()
        .and_then(move |enrollment| {
            let drop_enrollment = drop_enrollment.clone();
            async move { Ok(drop_one(&drop_enrollment, enrollment).await) }
        });

        self.executor
            .run(job_id, DROP_STUDENT_ENROLLMENTS_JOB, items)
            .await
    }
}

async fn drop_one(
    drop_enrollment: &DropEnrollment,
    enrollment: ActiveEnrollmentProjection,
) -> JobItemResult {
    JobExecutor::execute_item(
        format!("enrollment:{}", enrollment.id),
        drop_enrollment.execute(DropEnrollmentRequest {
            school_id: enrollment.school_id,
            student_id: enrollment.student_id,
        }),
    )
    .await
}

/// Listens on [`DROP_STUDENT_TOPIC`] and runs [`DropStudentEnrollments`] for
/// every message.
pub struct DropStudentEnrollmentsSubscriber {
    job: Arc<DropStudentEnrollments>,
}

impl DropStudentEnrollmentsSubscriber {
    pub fn new(job: Arc<DropStudentEnrollments>) -> Self {
        Self { job }
    }

    /// Handle one message. Malformed payloads are reported as technical errors.
    pub async fn handle(&self, message: &Message) -> Result<JobExecutionResult, Error> {
        info!(message_id = %message.id(), topic = message.topic(), "Message received");

        let dropped: StudentDropped = message.decode().map_err(|e| {
            technical(
                "SubscriberError",
                "Fail decoding student dropped message",
                schoolbill_core::attributes([("message_id", message.id().to_string())]),
                e,
            )
        })?;

        self.job.execute(dropped.student).await
    }

    /// Subscribe and process messages until the bus goes away.
    pub fn spawn(self, subscriber: &dyn Subscriber) -> JoinHandle<()> {
        let mut subscription = subscriber.subscribe(DROP_STUDENT_TOPIC);
        tokio::spawn(async move {
            while let Some(message) = subscription.recv().await {
                if let Err(err) = self.handle(&message).await {
                    warn!(message_id = %message.id(), code = err.code(), error = %err, "Fail handling message");
                }
            }
            info!(topic = DROP_STUDENT_TOPIC, "Subscription closed");
        })
    }
}
