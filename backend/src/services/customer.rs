//! Customer service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::validation::validate_email;

use crate::error::{AppError, AppResult};

/// Customer directory service
#[derive(Clone)]
pub struct CustomerService {
    db: PgPool,
}

/// Customer row with the number of sales recorded against it
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub notes: String,
    pub sales_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCustomerInput {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCustomerInput {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

const CUSTOMER_QUERY: &str = r#"
    SELECT c.id, c.name, c.phone, c.email, c.address, c.notes,
           COUNT(s.id) AS sales_count, c.created_at, c.updated_at
    FROM customers c
    LEFT JOIN sales s ON s.customer_id = c.id
"#;

impl CustomerService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_customers(&self) -> AppResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(&format!(
            "{} GROUP BY c.id ORDER BY c.name",
            CUSTOMER_QUERY
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(customers)
    }

    pub async fn get_customer(&self, customer_id: Uuid) -> AppResult<Customer> {
        sqlx::query_as::<_, Customer>(&format!(
            "{} WHERE c.id = $1 GROUP BY c.id",
            CUSTOMER_QUERY
        ))
        .bind(customer_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer".to_string()))
    }

    pub async fn create_customer(&self, input: CreateCustomerInput) -> AppResult<Customer> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Customer name cannot be empty".to_string(),
                message_es: "El nombre del cliente no puede estar vacío".to_string(),
            });
        }
        let email = input.email.unwrap_or_default();
        validate_customer_email(&email)?;

        let customer_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO customers (name, phone, email, address, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(input.phone.unwrap_or_default())
        .bind(email)
        .bind(input.address.unwrap_or_default())
        .bind(input.notes.unwrap_or_default())
        .fetch_one(&self.db)
        .await?;

        self.get_customer(customer_id).await
    }

    pub async fn update_customer(
        &self,
        customer_id: Uuid,
        input: UpdateCustomerInput,
    ) -> AppResult<Customer> {
        let existing = self.get_customer(customer_id).await?;

        let name = input.name.unwrap_or(existing.name);
        if name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Customer name cannot be empty".to_string(),
                message_es: "El nombre del cliente no puede estar vacío".to_string(),
            });
        }
        let email = input.email.unwrap_or(existing.email);
        validate_customer_email(&email)?;

        sqlx::query(
            r#"
            UPDATE customers
            SET name = $1, phone = $2, email = $3, address = $4, notes = $5, updated_at = now()
            WHERE id = $6
            "#,
        )
        .bind(name)
        .bind(input.phone.unwrap_or(existing.phone))
        .bind(email)
        .bind(input.address.unwrap_or(existing.address))
        .bind(input.notes.unwrap_or(existing.notes))
        .bind(customer_id)
        .execute(&self.db)
        .await?;

        self.get_customer(customer_id).await
    }

    /// Delete a customer; their sales survive with the snapshotted name
    pub async fn delete_customer(&self, customer_id: Uuid) -> AppResult<()> {
        let deleted = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(customer_id)
            .execute(&self.db)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(AppError::NotFound("Customer".to_string()));
        }
        Ok(())
    }
}

fn validate_customer_email(email: &str) -> AppResult<()> {
    if email.is_empty() {
        return Ok(());
    }
    validate_email(email).map_err(|msg| AppError::Validation {
        field: "email".to_string(),
        message: msg.to_string(),
        message_es: "El correo electrónico no es válido".to_string(),
    })
}
