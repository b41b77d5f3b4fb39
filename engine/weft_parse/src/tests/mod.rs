//! Registry/parser tests, relocated per the >200-line module convention.
