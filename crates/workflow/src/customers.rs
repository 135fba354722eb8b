use chrono::Utc;
use rust_decimal::Decimal;

use callplan_core::audit::AuditCategory;
use callplan_core::domain::customer::{
    Contact, ContactId, Customer, CustomerId, NewContact, NewCustomer,
};
use callplan_core::errors::{ApplicationError, DomainError};

use crate::context::{new_id, Caller, WorkflowContext};

#[derive(Clone)]
pub struct CustomerService {
    context: WorkflowContext,
}

impl CustomerService {
    pub fn new(context: WorkflowContext) -> Self {
        Self { context }
    }

    pub async fn register(
        &self,
        caller: &Caller,
        input: NewCustomer,
    ) -> Result<Customer, ApplicationError> {
        let result = self.register_inner(caller, input).await;
        let subject = result.as_ref().ok().map(|customer| customer.id.0.clone());
        self.context.record(
            caller,
            "customer.registered",
            AuditCategory::Customer,
            subject.as_deref(),
            result,
        )
    }

    async fn register_inner(
        &self,
        caller: &Caller,
        input: NewCustomer,
    ) -> Result<Customer, ApplicationError> {
        if input.code.trim().is_empty() {
            return Err(DomainError::Validation("customer code is required".to_owned()).into());
        }
        if input.name.trim().is_empty() {
            return Err(DomainError::Validation("customer name is required".to_owned()).into());
        }
        if input.location.is_some_and(|point| !point.is_valid()) {
            return Err(DomainError::Validation("customer location is out of range".to_owned()).into());
        }
        if input.monthly_revenue.is_some_and(|revenue| revenue < Decimal::ZERO) {
            return Err(DomainError::Validation("monthly revenue cannot be negative".to_owned()).into());
        }
        if self.context.customers.find_by_code(input.code.trim()).await?.is_some() {
            return Err(DomainError::Conflict(format!(
                "customer code `{}` is already registered",
                input.code.trim()
            ))
            .into());
        }

        let customer =
            Customer::new(CustomerId(new_id()), input, caller.user_id.clone(), Utc::now());
        self.context.customers.save(customer.clone()).await?;
        Ok(customer)
    }

    /// Re-derives the tier. Service levels stay as they were.
    pub async fn update_revenue(
        &self,
        caller: &Caller,
        customer_id: &CustomerId,
        revenue: Option<Decimal>,
    ) -> Result<Customer, ApplicationError> {
        let result = self.update_revenue_inner(customer_id, revenue).await;
        self.context.record(
            caller,
            "customer.revenue_updated",
            AuditCategory::Customer,
            Some(&customer_id.0),
            result,
        )
    }

    async fn update_revenue_inner(
        &self,
        customer_id: &CustomerId,
        revenue: Option<Decimal>,
    ) -> Result<Customer, ApplicationError> {
        if revenue.is_some_and(|value| value < Decimal::ZERO) {
            return Err(DomainError::Validation("monthly revenue cannot be negative".to_owned()).into());
        }
        let mut customer = self.get(customer_id).await?;
        customer.set_monthly_revenue(revenue, Utc::now());
        self.context.customers.save(customer.clone()).await?;
        Ok(customer)
    }

    pub async fn deactivate(
        &self,
        caller: &Caller,
        customer_id: &CustomerId,
    ) -> Result<Customer, ApplicationError> {
        let result = self.deactivate_inner(customer_id).await;
        self.context.record(
            caller,
            "customer.deactivated",
            AuditCategory::Customer,
            Some(&customer_id.0),
            result,
        )
    }

    async fn deactivate_inner(&self, customer_id: &CustomerId) -> Result<Customer, ApplicationError> {
        let mut customer = self.get(customer_id).await?;
        customer.active = false;
        customer.updated_at = Utc::now();
        self.context.customers.save(customer.clone()).await?;
        Ok(customer)
    }

    pub async fn add_contact(
        &self,
        caller: &Caller,
        customer_id: &CustomerId,
        input: NewContact,
    ) -> Result<Contact, ApplicationError> {
        let result = self.add_contact_inner(customer_id, input).await;
        self.context.record(
            caller,
            "customer.contact_added",
            AuditCategory::Customer,
            Some(&customer_id.0),
            result,
        )
    }

    async fn add_contact_inner(
        &self,
        customer_id: &CustomerId,
        input: NewContact,
    ) -> Result<Contact, ApplicationError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(DomainError::Validation("contact name is required".to_owned()).into());
        }
        let customer = self.require_active(customer_id).await?;
        let contact = Contact {
            id: ContactId(new_id()),
            customer_id: customer.id,
            name: name.to_owned(),
            title: input.title,
            phone: input.phone,
            email: input.email,
            is_primary: input.is_primary,
            created_at: Utc::now(),
        };
        self.context.customers.save_contact(contact.clone()).await?;
        Ok(contact)
    }

    pub async fn get(&self, customer_id: &CustomerId) -> Result<Customer, ApplicationError> {
        self.context
            .customers
            .find_by_id(customer_id)
            .await?
            .ok_or_else(|| DomainError::not_found("customer", customer_id.0.clone()).into())
    }

    pub async fn list_contacts(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<Contact>, ApplicationError> {
        self.get(customer_id).await?;
        Ok(self.context.customers.list_contacts(customer_id).await?)
    }

    /// Inactive customers take no new plans, check-ins, or contacts.
    pub(crate) async fn require_active(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Customer, ApplicationError> {
        let customer = self.get(customer_id).await?;
        if !customer.active {
            return Err(DomainError::Conflict(format!(
                "customer `{}` is inactive",
                customer.code
            ))
            .into());
        }
        Ok(customer)
    }

    /// The contact must exist and belong to `customer_id`.
    pub(crate) async fn require_contact_of(
        &self,
        customer_id: &CustomerId,
        contact_id: &ContactId,
    ) -> Result<Contact, ApplicationError> {
        let contact = self
            .context
            .customers
            .find_contact(contact_id)
            .await?
            .ok_or_else(|| DomainError::not_found("contact", contact_id.0.clone()))?;
        if !contact.belongs_to(customer_id) {
            return Err(DomainError::Conflict(format!(
                "contact `{contact_id}` does not belong to customer `{customer_id}`"
            ))
            .into());
        }
        Ok(contact)
    }
}
