//! # API REST
//!
//! REST API implementation for the clinic appointment service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, error status codes)
//!
//! Uses `api-shared` for wire types and `clinic-core` for every operation.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod startup;

use axum::{
    extract::{rejection::JsonRejection, Path as AxumPath, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_shared::{
    requester_id, AppointmentChangeRes, AppointmentRes, AvailableSlotsQuery, AvailableSlotsRes,
    CheckSlotQuery, CheckSlotRes, CreateAppointmentReq, DoctorPatientsRes, ErrorRes,
    HealthRes, HealthService, ListAppointmentsRes, PatientRecordRes, PatientSummaryRes,
    PrescriptionEntryRes, PrescriptionReq, PrescriptionRes, ProjectionRes, RejectReq,
    RescheduleReq, StatusUpdateReq, VisitSummaryRes, USER_ID_HEADER,
};
use clinic_core::{Appointment, AppointmentService, DocumentStore, StatusChange};

pub use error::ApiError;

/// The concrete service the REST server runs on.
pub type Service = AppointmentService<DocumentStore>;

/// Application state for the REST API server
///
/// Holds the appointment service; cloning is cheap (everything inside is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    pub service: Service,
}

impl AppState {
    pub fn new(service: Service) -> Self {
        Self { service }
    }

    fn appointment_res(&self, a: &Appointment) -> AppointmentRes {
        AppointmentRes::new(a, self.service.estimated_time(a))
    }

    fn list_res(&self, appointments: &[Appointment]) -> ListAppointmentsRes {
        ListAppointmentsRes {
            appointments: appointments.iter().map(|a| self.appointment_res(a)).collect(),
        }
    }

    fn change_res(&self, change: StatusChange) -> AppointmentChangeRes {
        match change {
            StatusChange::Approved(a) | StatusChange::Rejected(a) => {
                AppointmentChangeRes::appointment(self.appointment_res(&a))
            }
            StatusChange::Cancelled(change) => {
                AppointmentChangeRes::queue_change(&change, |a| self.service.estimated_time(a))
            }
            StatusChange::Completed(outcome) => {
                let res = AppointmentChangeRes::completion(&outcome);
                if res.is_partial() {
                    tracing::warn!(
                        "appointment {} completed but patient record not updated; repair with POST /appointments/{}/repair-projection",
                        outcome.appointment.id,
                        outcome.appointment.id
                    );
                }
                res
            }
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        create_appointment,
        list_appointments,
        approve_appointment,
        reject_appointment,
        doctor_queue,
        pending_requests,
        patient_appointments,
        update_status,
        cancel_appointment,
        reschedule_appointment,
        available_slots,
        check_slot,
        attach_prescription,
        repair_projection,
        patient_record,
        doctor_patients,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        CreateAppointmentReq,
        RejectReq,
        StatusUpdateReq,
        RescheduleReq,
        PrescriptionReq,
        AppointmentRes,
        PrescriptionRes,
        ListAppointmentsRes,
        AppointmentChangeRes,
        ProjectionRes,
        AvailableSlotsRes,
        CheckSlotRes,
        PatientRecordRes,
        VisitSummaryRes,
        PrescriptionEntryRes,
        PatientSummaryRes,
        DoctorPatientsRes,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/appointments",
            post(create_appointment).get(list_appointments),
        )
        .route("/appointments/available-slots", get(available_slots))
        .route("/appointments/check-slot", get(check_slot))
        .route("/appointments/doctor/:email", get(doctor_queue))
        .route("/appointments/requests/:email", get(pending_requests))
        .route("/appointments/patient/:patient_id", get(patient_appointments))
        .route(
            "/appointments/:id",
            put(reschedule_appointment).delete(cancel_appointment),
        )
        .route("/appointments/:id/approve", put(approve_appointment))
        .route("/appointments/:id/reject", put(reject_appointment))
        .route("/appointments/:id/status", put(update_status))
        .route("/appointments/:id/prescription", put(attach_prescription))
        .route(
            "/appointments/:id/repair-projection",
            post(repair_projection),
        )
        .route("/patients/profile/:email", get(patient_record))
        .route("/doctors/:email/patients", get(doctor_patients))
        .merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used for monitoring and load balancer health checks.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/appointments",
    request_body = CreateAppointmentReq,
    params(("x-user-id" = String, Header, description = "Id of the booking patient")),
    responses(
        (status = 201, description = "Request stored as pending_request", body = AppointmentRes),
        (status = 400, description = "Invalid input or unknown doctor", body = ErrorRes),
        (status = 401, description = "Missing caller id", body = ErrorRes),
        (status = 403, description = "Caller is not the booking patient", body = ErrorRes),
        (status = 404, description = "Caller not found", body = ErrorRes),
        (status = 409, description = "Duplicate active request", body = ErrorRes)
    )
)]
/// Submit a new appointment request
///
/// The request is stored unqueued; capacity is enforced on approval.
#[axum::debug_handler]
async fn create_appointment(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CreateAppointmentReq>, JsonRejection>,
) -> Result<(StatusCode, Json<AppointmentRes>), ApiError> {
    let header = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok());
    let user_id = requester_id(header)?;
    let Json(req) = body?;

    let appointment = state
        .service
        .request_appointment(user_id, req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(state.appointment_res(&appointment))))
}

#[utoipa::path(
    get,
    path = "/appointments",
    responses(
        (status = 200, description = "Every appointment", body = ListAppointmentsRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn list_appointments(
    State(state): State<AppState>,
) -> Result<Json<ListAppointmentsRes>, ApiError> {
    let appointments = state.service.all_appointments().await?;
    Ok(Json(state.list_res(&appointments)))
}

#[utoipa::path(
    put,
    path = "/appointments/{id}/approve",
    params(("id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Approved with a serial number", body = AppointmentRes),
        (status = 404, description = "Not found or already processed", body = ErrorRes),
        (status = 409, description = "Queue full", body = ErrorRes)
    )
)]
/// Approve a pending request
///
/// Assigns the next serial number in the slot, or fails with `409` when the slot's queue is
/// at capacity.
#[axum::debug_handler]
async fn approve_appointment(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<AppointmentRes>, ApiError> {
    let appointment = state.service.approve(&id).await?;
    Ok(Json(state.appointment_res(&appointment)))
}

#[utoipa::path(
    put,
    path = "/appointments/{id}/reject",
    params(("id" = String, Path, description = "Appointment id")),
    request_body = RejectReq,
    responses(
        (status = 200, description = "Rejected", body = AppointmentRes),
        (status = 404, description = "Not found or already processed", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn reject_appointment(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    body: Result<Json<RejectReq>, JsonRejection>,
) -> Result<Json<AppointmentRes>, ApiError> {
    // The body is optional here; only a body that is present but malformed is an error.
    let reason = match body {
        Ok(Json(req)) => req.rejection_reason,
        Err(JsonRejection::MissingJsonContentType(_)) => None,
        Err(rejection) => return Err(rejection.into()),
    };
    let appointment = state.service.reject(&id, reason).await?;
    Ok(Json(state.appointment_res(&appointment)))
}

#[utoipa::path(
    get,
    path = "/appointments/doctor/{email}",
    params(("email" = String, Path, description = "Doctor email")),
    responses(
        (status = 200, description = "Doctor's appointments by date, slot and serial", body = ListAppointmentsRes),
        (status = 400, description = "Unknown doctor", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn doctor_queue(
    State(state): State<AppState>,
    AxumPath(email): AxumPath<String>,
) -> Result<Json<ListAppointmentsRes>, ApiError> {
    let appointments = state.service.doctor_queue(&email).await?;
    Ok(Json(state.list_res(&appointments)))
}

#[utoipa::path(
    get,
    path = "/appointments/requests/{email}",
    params(("email" = String, Path, description = "Doctor email")),
    responses(
        (status = 200, description = "Pending requests, oldest first", body = ListAppointmentsRes),
        (status = 400, description = "Unknown doctor", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn pending_requests(
    State(state): State<AppState>,
    AxumPath(email): AxumPath<String>,
) -> Result<Json<ListAppointmentsRes>, ApiError> {
    let appointments = state.service.pending_requests(&email).await?;
    Ok(Json(state.list_res(&appointments)))
}

#[utoipa::path(
    get,
    path = "/appointments/patient/{patient_id}",
    params(("patient_id" = String, Path, description = "Patient user id")),
    responses(
        (status = 200, description = "Patient's appointments", body = ListAppointmentsRes)
    )
)]
#[axum::debug_handler]
async fn patient_appointments(
    State(state): State<AppState>,
    AxumPath(patient_id): AxumPath<String>,
) -> Result<Json<ListAppointmentsRes>, ApiError> {
    let appointments = state.service.patient_appointments(&patient_id).await?;
    Ok(Json(state.list_res(&appointments)))
}

#[utoipa::path(
    put,
    path = "/appointments/{id}/status",
    params(("id" = String, Path, description = "Appointment id")),
    request_body = StatusUpdateReq,
    responses(
        (status = 200, description = "Status changed", body = AppointmentChangeRes),
        (status = 400, description = "Invalid status", body = ErrorRes),
        (status = 404, description = "Not found", body = ErrorRes),
        (status = 409, description = "Illegal transition or queue full", body = ErrorRes)
    )
)]
/// Generic status update
///
/// `completed` includes the patient-record projection outcome; `cancelled` includes the
/// renumbered queue of the vacated slot.
#[axum::debug_handler]
async fn update_status(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    body: Result<Json<StatusUpdateReq>, JsonRejection>,
) -> Result<Json<AppointmentChangeRes>, ApiError> {
    let Json(req) = body?;
    let status = req.status.unwrap_or_default();
    let change = state.service.apply_status(&id, &status).await?;
    Ok(Json(state.change_res(change)))
}

#[utoipa::path(
    delete,
    path = "/appointments/{id}",
    params(("id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Cancelled", body = AppointmentChangeRes),
        (status = 404, description = "Not found", body = ErrorRes),
        (status = 409, description = "Already finished", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn cancel_appointment(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<AppointmentChangeRes>, ApiError> {
    let change = state.service.cancel(&id).await?;
    Ok(Json(state.change_res(StatusChange::Cancelled(change))))
}

#[utoipa::path(
    put,
    path = "/appointments/{id}",
    params(("id" = String, Path, description = "Appointment id")),
    request_body = RescheduleReq,
    responses(
        (status = 200, description = "Rescheduled", body = AppointmentChangeRes),
        (status = 400, description = "Invalid date or slot", body = ErrorRes),
        (status = 404, description = "Not found", body = ErrorRes),
        (status = 409, description = "Slot full or appointment finished", body = ErrorRes)
    )
)]
/// Reschedule an appointment
///
/// Capacity at the target slot is checked without counting the appointment itself.
#[axum::debug_handler]
async fn reschedule_appointment(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    body: Result<Json<RescheduleReq>, JsonRejection>,
) -> Result<Json<AppointmentChangeRes>, ApiError> {
    let Json(req) = body?;
    let change = state
        .service
        .reschedule(
            &id,
            req.appointment_date.as_deref(),
            req.appointment_time.as_deref(),
            req.symptoms,
        )
        .await?;
    Ok(Json(AppointmentChangeRes::queue_change(&change, |a| {
        state.service.estimated_time(a)
    })))
}

#[utoipa::path(
    get,
    path = "/appointments/available-slots",
    params(AvailableSlotsQuery),
    responses(
        (status = 200, description = "Slots with spare capacity", body = AvailableSlotsRes),
        (status = 400, description = "Invalid doctor or date", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn available_slots(
    State(state): State<AppState>,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<Json<AvailableSlotsRes>, ApiError> {
    let exclude = non_blank(query.exclude_appointment_id);
    let available_slots = state
        .service
        .available_slots(
            query.doctor_email.as_deref().unwrap_or_default(),
            query.date.as_deref().unwrap_or_default(),
            exclude.as_deref(),
        )
        .await?;
    Ok(Json(AvailableSlotsRes { available_slots }))
}

#[utoipa::path(
    get,
    path = "/appointments/check-slot",
    params(CheckSlotQuery),
    responses(
        (status = 200, description = "Occupancy of one slot", body = CheckSlotRes),
        (status = 400, description = "Invalid doctor, date or slot", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn check_slot(
    State(state): State<AppState>,
    Query(query): Query<CheckSlotQuery>,
) -> Result<Json<CheckSlotRes>, ApiError> {
    let exclude = non_blank(query.exclude_appointment_id);
    let availability = state
        .service
        .check_slot(
            query.doctor_email.as_deref().unwrap_or_default(),
            query.appointment_date.as_deref().unwrap_or_default(),
            query.appointment_time.as_deref().unwrap_or_default(),
            exclude.as_deref(),
        )
        .await?;
    Ok(Json(availability.into()))
}

#[utoipa::path(
    put,
    path = "/appointments/{id}/prescription",
    params(("id" = String, Path, description = "Appointment id")),
    request_body = PrescriptionReq,
    responses(
        (status = 200, description = "Prescription attached", body = AppointmentRes),
        (status = 400, description = "Missing prescription fields", body = ErrorRes),
        (status = 404, description = "Not found or not active", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn attach_prescription(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    body: Result<Json<PrescriptionReq>, JsonRejection>,
) -> Result<Json<AppointmentRes>, ApiError> {
    let Json(req) = body?;
    let appointment = state.service.attach_prescription(&id, req.into()).await?;
    Ok(Json(state.appointment_res(&appointment)))
}

#[utoipa::path(
    post,
    path = "/appointments/{id}/repair-projection",
    params(("id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Projection re-run", body = ProjectionRes),
        (status = 404, description = "Not found", body = ErrorRes),
        (status = 409, description = "Appointment not completed", body = ErrorRes)
    )
)]
/// Re-run the patient-record projection for a completed appointment
///
/// Idempotent: a visit already in the record is reported as `already_applied`.
#[axum::debug_handler]
async fn repair_projection(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<ProjectionRes>, ApiError> {
    let outcome = state.service.repair_projection(&id).await?;
    Ok(Json(ProjectionRes::from(&outcome)))
}

#[utoipa::path(
    get,
    path = "/patients/profile/{email}",
    params(("email" = String, Path, description = "Patient email")),
    responses(
        (status = 200, description = "Patient record", body = PatientRecordRes),
        (status = 404, description = "No completed visits yet", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn patient_record(
    State(state): State<AppState>,
    AxumPath(email): AxumPath<String>,
) -> Result<Json<PatientRecordRes>, ApiError> {
    let record = state.service.patient_record(&email).await?;
    Ok(Json(PatientRecordRes::from(&record)))
}

#[utoipa::path(
    get,
    path = "/doctors/{email}/patients",
    params(("email" = String, Path, description = "Doctor email")),
    responses(
        (status = 200, description = "Patients with a completed visit", body = DoctorPatientsRes),
        (status = 400, description = "Unknown doctor", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn doctor_patients(
    State(state): State<AppState>,
    AxumPath(email): AxumPath<String>,
) -> Result<Json<DoctorPatientsRes>, ApiError> {
    let patients = state.service.doctor_patients(&email).await?;
    Ok(Json(DoctorPatientsRes {
        patients: patients.iter().map(PatientSummaryRes::from).collect(),
    }))
}
