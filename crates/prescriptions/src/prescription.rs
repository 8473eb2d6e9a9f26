use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dispensary_core::{
    Aggregate, AggregateRoot, DomainError, EntityKind, MedicationId, PatientId, PrescribedLineId,
    PrescriptionId, Quantity, RequisitionId,
};
use dispensary_events::Event;

/// Stream type name for prescription streams.
pub const PRESCRIPTION_AGGREGATE: &str = "prescriptions.prescription";

/// One medication line of a prescription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrescribedLine {
    pub line_id: PrescribedLineId,
    pub medication_id: MedicationId,
    pub dosage: String,
    pub period: String,
    pub quantity: Quantity,
}

/// Aggregate root: Prescription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prescription {
    id: PrescriptionId,
    patient_id: PatientId,
    description: String,
    prescriber_license: String,
    issued_at: DateTime<Utc>,
    expires_on: NaiveDate,
    lines: Vec<PrescribedLine>,
    dispensed_by: Option<RequisitionId>,
    version: u64,
    created: bool,
}

impl Prescription {
    /// Create an empty, not-yet-issued aggregate instance for rehydration.
    pub fn empty(id: PrescriptionId) -> Self {
        Self {
            id,
            patient_id: PatientId::from_uuid(Uuid::nil()),
            description: String::new(),
            prescriber_license: String::new(),
            issued_at: DateTime::<Utc>::MIN_UTC,
            expires_on: NaiveDate::MIN,
            lines: Vec::new(),
            dispensed_by: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PrescriptionId {
        self.id
    }

    pub fn patient_id(&self) -> PatientId {
        self.patient_id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn prescriber_license(&self) -> &str {
        &self.prescriber_license
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_on(&self) -> NaiveDate {
        self.expires_on
    }

    pub fn lines(&self) -> &[PrescribedLine] {
        &self.lines
    }

    pub fn line(&self, line_id: PrescribedLineId) -> Option<&PrescribedLine> {
        self.lines.iter().find(|l| l.line_id == line_id)
    }

    /// Requisition that dispensed this prescription, if any.
    pub fn dispensed_by(&self) -> Option<RequisitionId> {
        self.dispensed_by
    }

    pub fn is_dispensed(&self) -> bool {
        self.dispensed_by.is_some()
    }

    pub fn is_issued(&self) -> bool {
        self.created
    }

    /// Whether the prescription can be dispensed on `on`.
    ///
    /// Checked in order: already dispensed, no lines, expired. A prescription
    /// is still valid on its expiry date.
    pub fn check_dispensable(&self, on: NaiveDate) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(EntityKind::Prescription, self.id));
        }
        if self.is_dispensed() {
            return Err(DomainError::PrescriptionDispensed(self.id));
        }
        if self.lines.is_empty() {
            return Err(DomainError::EmptyPrescription(self.id));
        }
        if self.expires_on < on {
            return Err(DomainError::ExpiredPrescription {
                prescription_id: self.id,
                expired_on: self.expires_on,
            });
        }
        Ok(())
    }
}

impl AggregateRoot for Prescription {
    type Id = PrescriptionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: IssuePrescription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuePrescription {
    pub prescription_id: PrescriptionId,
    pub patient_id: PatientId,
    pub description: String,
    pub prescriber_license: String,
    pub expires_on: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Command: EditPrescription (header fields only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditPrescription {
    pub prescription_id: PrescriptionId,
    pub patient_id: PatientId,
    pub description: String,
    pub prescriber_license: String,
    pub expires_on: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddLine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLine {
    pub prescription_id: PrescriptionId,
    pub line_id: PrescribedLineId,
    pub medication_id: MedicationId,
    pub dosage: String,
    pub period: String,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveLine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLine {
    pub prescription_id: PrescriptionId,
    pub line_id: PrescribedLineId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkDispensed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkDispensed {
    pub prescription_id: PrescriptionId,
    pub requisition_id: RequisitionId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrescriptionCommand {
    IssuePrescription(IssuePrescription),
    EditPrescription(EditPrescription),
    AddLine(AddLine),
    RemoveLine(RemoveLine),
    MarkDispensed(MarkDispensed),
}

/// Event: PrescriptionIssued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrescriptionIssued {
    pub prescription_id: PrescriptionId,
    pub patient_id: PatientId,
    pub description: String,
    pub prescriber_license: String,
    pub expires_on: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PrescriptionEdited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrescriptionEdited {
    pub prescription_id: PrescriptionId,
    pub patient_id: PatientId,
    pub description: String,
    pub prescriber_license: String,
    pub expires_on: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAdded {
    pub prescription_id: PrescriptionId,
    pub line: PrescribedLine,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRemoved {
    pub prescription_id: PrescriptionId,
    pub line_id: PrescribedLineId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MarkedDispensed. Freezes the lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkedDispensed {
    pub prescription_id: PrescriptionId,
    pub requisition_id: RequisitionId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrescriptionEvent {
    PrescriptionIssued(PrescriptionIssued),
    PrescriptionEdited(PrescriptionEdited),
    LineAdded(LineAdded),
    LineRemoved(LineRemoved),
    MarkedDispensed(MarkedDispensed),
}

impl Event for PrescriptionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PrescriptionEvent::PrescriptionIssued(_) => "prescriptions.prescription.issued",
            PrescriptionEvent::PrescriptionEdited(_) => "prescriptions.prescription.edited",
            PrescriptionEvent::LineAdded(_) => "prescriptions.prescription.line_added",
            PrescriptionEvent::LineRemoved(_) => "prescriptions.prescription.line_removed",
            PrescriptionEvent::MarkedDispensed(_) => "prescriptions.prescription.dispensed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PrescriptionEvent::PrescriptionIssued(e) => e.occurred_at,
            PrescriptionEvent::PrescriptionEdited(e) => e.occurred_at,
            PrescriptionEvent::LineAdded(e) => e.occurred_at,
            PrescriptionEvent::LineRemoved(e) => e.occurred_at,
            PrescriptionEvent::MarkedDispensed(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Prescription {
    type Command = PrescriptionCommand;
    type Event = PrescriptionEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PrescriptionEvent::PrescriptionIssued(e) => {
                self.id = e.prescription_id;
                self.patient_id = e.patient_id;
                self.description = e.description.clone();
                self.prescriber_license = e.prescriber_license.clone();
                self.issued_at = e.occurred_at;
                self.expires_on = e.expires_on;
                self.lines.clear();
                self.dispensed_by = None;
                self.created = true;
            }
            PrescriptionEvent::PrescriptionEdited(e) => {
                self.patient_id = e.patient_id;
                self.description = e.description.clone();
                self.prescriber_license = e.prescriber_license.clone();
                self.expires_on = e.expires_on;
            }
            PrescriptionEvent::LineAdded(e) => {
                self.lines.push(e.line.clone());
            }
            PrescriptionEvent::LineRemoved(e) => {
                self.lines.retain(|l| l.line_id != e.line_id);
            }
            PrescriptionEvent::MarkedDispensed(e) => {
                self.dispensed_by = Some(e.requisition_id);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PrescriptionCommand::IssuePrescription(cmd) => self.handle_issue(cmd),
            PrescriptionCommand::EditPrescription(cmd) => self.handle_edit(cmd),
            PrescriptionCommand::AddLine(cmd) => self.handle_add_line(cmd),
            PrescriptionCommand::RemoveLine(cmd) => self.handle_remove_line(cmd),
            PrescriptionCommand::MarkDispensed(cmd) => self.handle_mark_dispensed(cmd),
        }
    }
}

impl Prescription {
    fn ensure_issued(&self, prescription_id: PrescriptionId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(
                EntityKind::Prescription,
                prescription_id,
            ));
        }
        if self.id != prescription_id {
            return Err(DomainError::invariant("prescription_id mismatch"));
        }
        Ok(())
    }

    fn ensure_editable_lines(&self) -> Result<(), DomainError> {
        if self.is_dispensed() {
            return Err(DomainError::PrescriptionDispensed(self.id));
        }
        Ok(())
    }

    fn validate_header(
        description: &str,
        prescriber_license: &str,
        issued_on: NaiveDate,
        expires_on: NaiveDate,
    ) -> Result<(), DomainError> {
        if description.trim().is_empty() {
            return Err(DomainError::validation("description cannot be empty"));
        }
        if prescriber_license.trim().is_empty() {
            return Err(DomainError::validation("prescriber license cannot be empty"));
        }
        if expires_on < issued_on {
            return Err(DomainError::validation(format!(
                "expiry date {expires_on} is before issue date {issued_on}"
            )));
        }
        Ok(())
    }

    fn handle_issue(
        &self,
        cmd: &IssuePrescription,
    ) -> Result<Vec<PrescriptionEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("prescription already exists"));
        }
        Self::validate_header(
            &cmd.description,
            &cmd.prescriber_license,
            cmd.occurred_at.date_naive(),
            cmd.expires_on,
        )?;

        Ok(vec![PrescriptionEvent::PrescriptionIssued(
            PrescriptionIssued {
                prescription_id: cmd.prescription_id,
                patient_id: cmd.patient_id,
                description: cmd.description.trim().to_string(),
                prescriber_license: cmd.prescriber_license.trim().to_string(),
                expires_on: cmd.expires_on,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_edit(&self, cmd: &EditPrescription) -> Result<Vec<PrescriptionEvent>, DomainError> {
        self.ensure_issued(cmd.prescription_id)?;
        Self::validate_header(
            &cmd.description,
            &cmd.prescriber_license,
            self.issued_at.date_naive(),
            cmd.expires_on,
        )?;

        Ok(vec![PrescriptionEvent::PrescriptionEdited(
            PrescriptionEdited {
                prescription_id: cmd.prescription_id,
                patient_id: cmd.patient_id,
                description: cmd.description.trim().to_string(),
                prescriber_license: cmd.prescriber_license.trim().to_string(),
                expires_on: cmd.expires_on,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_add_line(&self, cmd: &AddLine) -> Result<Vec<PrescriptionEvent>, DomainError> {
        self.ensure_issued(cmd.prescription_id)?;
        self.ensure_editable_lines()?;

        let quantity = Quantity::new(cmd.quantity)?;
        if cmd.dosage.trim().is_empty() {
            return Err(DomainError::validation("dosage cannot be empty"));
        }
        if cmd.period.trim().is_empty() {
            return Err(DomainError::validation("period cannot be empty"));
        }
        if self.line(cmd.line_id).is_some() {
            return Err(DomainError::conflict(format!(
                "line {} already exists",
                cmd.line_id
            )));
        }

        Ok(vec![PrescriptionEvent::LineAdded(LineAdded {
            prescription_id: cmd.prescription_id,
            line: PrescribedLine {
                line_id: cmd.line_id,
                medication_id: cmd.medication_id,
                dosage: cmd.dosage.trim().to_string(),
                period: cmd.period.trim().to_string(),
                quantity,
            },
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_line(&self, cmd: &RemoveLine) -> Result<Vec<PrescriptionEvent>, DomainError> {
        self.ensure_issued(cmd.prescription_id)?;
        self.ensure_editable_lines()?;

        if self.line(cmd.line_id).is_none() {
            return Err(DomainError::LineNotFound {
                prescription_id: cmd.prescription_id,
                line_id: cmd.line_id,
            });
        }

        Ok(vec![PrescriptionEvent::LineRemoved(LineRemoved {
            prescription_id: cmd.prescription_id,
            line_id: cmd.line_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_dispensed(
        &self,
        cmd: &MarkDispensed,
    ) -> Result<Vec<PrescriptionEvent>, DomainError> {
        self.ensure_issued(cmd.prescription_id)?;
        self.check_dispensable(cmd.occurred_at.date_naive())?;

        Ok(vec![PrescriptionEvent::MarkedDispensed(MarkedDispensed {
            prescription_id: cmd.prescription_id,
            requisition_id: cmd.requisition_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
